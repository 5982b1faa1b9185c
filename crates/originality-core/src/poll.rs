//! Read-only status polling until an analysis reaches a terminal state.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::AnalysisStore;
use crate::{AnalysisStatus, CoreError};

/// Poll `id` every `interval` until it is completed or failed.
///
/// Returns the terminal status, or `Ok(None)` if `cancel` fires first. Read
/// errors (including an unknown id) end polling with the error.
pub async fn wait_for_terminal(
    store: &dyn AnalysisStore,
    id: i64,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<Option<AnalysisStatus>, CoreError> {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(id, "status polling cancelled");
                return Ok(None);
            }
            _ = ticker.tick() => {
                let status = store.status(id)?;
                if status.is_terminal() {
                    return Ok(Some(status));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewDocument, SqliteStore};
    use crate::{InputType, PdfExtractionStatus};
    use std::sync::Arc;

    fn store_with_record() -> (Arc<SqliteStore>, i64) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let id = store
            .create(&NewDocument {
                title: "t".into(),
                input_type: InputType::Text,
                text: "body".into(),
                pdf_extraction_status: PdfExtractionStatus::NotApplicable,
            })
            .unwrap();
        (store, id)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_terminal_status() {
        let (store, id) = store_with_record();
        store.mark_processing(id).unwrap();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            writer.mark_failed(id).unwrap();
        });

        let cancel = CancellationToken::new();
        let status = wait_for_terminal(store.as_ref(), id, Duration::from_secs(2), &cancel)
            .await
            .unwrap();
        assert_eq!(status, Some(AnalysisStatus::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let (store, id) = store_with_record();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let status = wait_for_terminal(store.as_ref(), id, Duration::from_secs(1), &cancel)
            .await
            .unwrap();
        assert_eq!(status, None);
        // Polling never writes.
        assert_eq!(store.status(id).unwrap(), AnalysisStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_id_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancellationToken::new();
        let result = wait_for_terminal(&store, 42, Duration::from_millis(10), &cancel).await;
        assert!(matches!(result, Err(CoreError::NotFound(42))));
    }
}
