//! Persistent analysis records and their similarity matches.
//!
//! Structured result fields are stored as JSON text. Every status change is
//! checked against the analysis lifecycle inside a transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, params};
use serde::{Deserialize, Serialize};

use crate::pipeline::AnalysisOutcome;
use crate::{
    AnalysisStatus, CoreError, DetectionStatus, GuidanceSuggestion, IdentifiedAssumptions,
    InputType, NoveltyAnalysis, PdfExtractionStatus, ResearchOverview, SimilarityMatch,
    UniquenessLevel,
};

/// A submitted document, before analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub input_type: InputType,
    pub text: String,
    #[serde(default)]
    pub pdf_extraction_status: PdfExtractionStatus,
}

/// A stored analysis with its matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: i64,
    pub title: String,
    pub input_type: InputType,
    pub original_text: String,
    pub pdf_extraction_status: PdfExtractionStatus,
    pub status: AnalysisStatus,
    pub body_text: Option<String>,
    pub references_text: Option<String>,
    pub reference_detection_status: Option<DetectionStatus>,
    pub overall_similarity_score: Option<f64>,
    pub uniqueness_level: Option<UniquenessLevel>,
    pub research_overview: Option<ResearchOverview>,
    pub novelty_analysis: Option<NoveltyAnalysis>,
    pub identified_assumptions: Option<IdentifiedAssumptions>,
    pub guidance_suggestions: Vec<GuidanceSuggestion>,
    pub matches: Vec<SimilarityMatch>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AnalysisRecord {
    /// Text to highlight: the body if segmentation ran, else the original.
    pub fn display_text(&self) -> &str {
        self.body_text.as_deref().unwrap_or(&self.original_text)
    }
}

/// Storage for analysis records.
pub trait AnalysisStore: Send + Sync {
    /// Store a new document; its analysis starts `pending`.
    fn create(&self, doc: &NewDocument) -> Result<i64, CoreError>;

    /// Read a record with its matches.
    fn get(&self, id: i64) -> Result<AnalysisRecord, CoreError>;

    fn status(&self, id: i64) -> Result<AnalysisStatus, CoreError>;

    /// `pending -> processing`.
    fn mark_processing(&self, id: i64) -> Result<(), CoreError>;

    /// `processing -> completed`, writing every result field and all matches
    /// atomically.
    fn complete(&self, id: i64, outcome: &AnalysisOutcome) -> Result<(), CoreError>;

    /// `processing -> failed`. Only the status changes.
    fn mark_failed(&self, id: i64) -> Result<(), CoreError>;

    /// Remove a record and its matches.
    fn delete(&self, id: i64) -> Result<(), CoreError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS analyses (
    id                         INTEGER PRIMARY KEY AUTOINCREMENT,
    title                      TEXT NOT NULL,
    input_type                 TEXT NOT NULL,
    original_text              TEXT NOT NULL,
    pdf_extraction_status      TEXT NOT NULL,
    status                     TEXT NOT NULL,
    body_text                  TEXT,
    references_text            TEXT,
    reference_detection_status TEXT,
    overall_similarity_score   REAL,
    uniqueness_level           TEXT,
    research_overview          TEXT,
    novelty_analysis           TEXT,
    identified_assumptions     TEXT,
    guidance_suggestions       TEXT,
    created_at                 INTEGER NOT NULL,
    updated_at                 INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS similarity_matches (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id           INTEGER NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    paper_title           TEXT NOT NULL,
    paper_source          TEXT NOT NULL,
    paper_url             TEXT NOT NULL,
    matched_text_user     TEXT NOT NULL,
    matched_text_paper    TEXT NOT NULL,
    similarity_percentage REAL NOT NULL,
    is_referenced         INTEGER NOT NULL,
    section_name          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_matches_analysis ON similarity_matches(analysis_id);";

/// Open a SQLite connection with WAL mode and standard pragmas.
fn open_sqlite(path: &Path) -> Result<Connection, rusqlite::Error> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// SQLite-backed [`AnalysisStore`], file-backed or in-memory.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(open_sqlite(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_status(conn: &Connection, id: i64) -> Result<AnalysisStatus, CoreError> {
    let raw: Option<String> = conn
        .query_row("SELECT status FROM analyses WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    let raw = raw.ok_or(CoreError::NotFound(id))?;
    AnalysisStatus::parse(&raw)
        .ok_or_else(|| CoreError::Validation(format!("unknown status '{raw}' for analysis {id}")))
}

/// Check and apply a status transition inside `tx`.
fn transition(tx: &Transaction<'_>, id: i64, next: AnalysisStatus) -> Result<(), CoreError> {
    let current = read_status(tx, id)?;
    if !current.can_transition_to(next) {
        return Err(CoreError::InvalidTransition {
            id,
            from: current.as_str(),
            to: next.as_str(),
        });
    }
    tx.execute(
        "UPDATE analyses SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![next.as_str(), now_epoch(), id],
    )?;
    Ok(())
}

fn from_json<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>, CoreError> {
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

impl AnalysisStore for SqliteStore {
    fn create(&self, doc: &NewDocument) -> Result<i64, CoreError> {
        let conn = self.lock();
        let now = now_epoch();
        conn.execute(
            "INSERT INTO analyses (title, input_type, original_text, pdf_extraction_status, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                doc.title,
                doc.input_type.as_str(),
                doc.text,
                doc.pdf_extraction_status.as_str(),
                AnalysisStatus::Pending.as_str(),
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, title = %doc.title, "analysis record created");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<AnalysisRecord, CoreError> {
        let conn = self.lock();

        type Row = (
            String,
            String,
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<f64>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            i64,
            i64,
        );
        let row: Option<Row> = conn
            .query_row(
                "SELECT title, input_type, original_text, pdf_extraction_status, status,
                        body_text, references_text, reference_detection_status,
                        overall_similarity_score, uniqueness_level, research_overview,
                        novelty_analysis, identified_assumptions, guidance_suggestions,
                        created_at, updated_at
                 FROM analyses WHERE id = ?1",
                [id],
                |r| {
                    Ok((
                        r.get(0)?,
                        r.get(1)?,
                        r.get(2)?,
                        r.get(3)?,
                        r.get(4)?,
                        r.get(5)?,
                        r.get(6)?,
                        r.get(7)?,
                        r.get(8)?,
                        r.get(9)?,
                        r.get(10)?,
                        r.get(11)?,
                        r.get(12)?,
                        r.get(13)?,
                        r.get(14)?,
                        r.get(15)?,
                    ))
                },
            )
            .optional()?;
        let Some((
            title,
            input_type,
            original_text,
            pdf_status,
            status,
            body_text,
            references_text,
            detection,
            score,
            level,
            overview,
            novelty,
            assumptions,
            guidance,
            created_at,
            updated_at,
        )) = row
        else {
            return Err(CoreError::NotFound(id));
        };

        let mut stmt = conn.prepare(
            "SELECT paper_title, paper_source, paper_url, matched_text_user, matched_text_paper,
                    similarity_percentage, is_referenced, section_name
             FROM similarity_matches WHERE analysis_id = ?1 ORDER BY id",
        )?;
        let matches = stmt
            .query_map([id], |r| {
                Ok(SimilarityMatch {
                    paper_title: r.get(0)?,
                    paper_source: r.get(1)?,
                    paper_url: r.get(2)?,
                    matched_text_user: r.get(3)?,
                    matched_text_paper: r.get(4)?,
                    similarity_percentage: r.get(5)?,
                    is_referenced: r.get(6)?,
                    section_name: r.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let bad = |field: &str, value: &str| {
            CoreError::Validation(format!("unknown {field} '{value}' for analysis {id}"))
        };

        Ok(AnalysisRecord {
            id,
            title,
            input_type: InputType::parse(&input_type).ok_or_else(|| bad("input type", &input_type))?,
            original_text,
            pdf_extraction_status: PdfExtractionStatus::parse(&pdf_status)
                .ok_or_else(|| bad("pdf extraction status", &pdf_status))?,
            status: AnalysisStatus::parse(&status).ok_or_else(|| bad("status", &status))?,
            body_text,
            references_text,
            reference_detection_status: detection.as_deref().and_then(DetectionStatus::parse),
            overall_similarity_score: score,
            uniqueness_level: level.as_deref().and_then(UniquenessLevel::parse),
            research_overview: from_json(overview)?,
            novelty_analysis: from_json(novelty)?,
            identified_assumptions: from_json(assumptions)?,
            guidance_suggestions: from_json(guidance)?.unwrap_or_default(),
            matches,
            created_at,
            updated_at,
        })
    }

    fn status(&self, id: i64) -> Result<AnalysisStatus, CoreError> {
        read_status(&self.lock(), id)
    }

    fn mark_processing(&self, id: i64) -> Result<(), CoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        transition(&tx, id, AnalysisStatus::Processing)?;
        tx.commit()?;
        Ok(())
    }

    fn complete(&self, id: i64, outcome: &AnalysisOutcome) -> Result<(), CoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        transition(&tx, id, AnalysisStatus::Completed)?;

        tx.execute(
            "UPDATE analyses SET
                body_text = ?1,
                references_text = ?2,
                reference_detection_status = ?3,
                pdf_extraction_status = ?4,
                overall_similarity_score = ?5,
                uniqueness_level = ?6,
                research_overview = ?7,
                novelty_analysis = ?8,
                identified_assumptions = ?9,
                guidance_suggestions = ?10
             WHERE id = ?11",
            params![
                outcome.segmented.body_text,
                outcome.segmented.references_text,
                outcome.segmented.detection_status.as_str(),
                outcome.pdf_extraction_status.as_str(),
                outcome.overall_score,
                outcome.uniqueness_level.as_str(),
                serde_json::to_string(&outcome.research_overview)?,
                serde_json::to_string(&outcome.novelty_analysis)?,
                serde_json::to_string(&outcome.identified_assumptions)?,
                serde_json::to_string(&outcome.guidance)?,
                id
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO similarity_matches
                    (analysis_id, paper_title, paper_source, paper_url, matched_text_user,
                     matched_text_paper, similarity_percentage, is_referenced, section_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for m in &outcome.matches {
                stmt.execute(params![
                    id,
                    m.paper_title,
                    m.paper_source,
                    m.paper_url,
                    m.matched_text_user,
                    m.matched_text_paper,
                    m.similarity_percentage,
                    m.is_referenced,
                    m.section_name
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(id, matches = outcome.matches.len(), "analysis completed in store");
        Ok(())
    }

    fn mark_failed(&self, id: i64) -> Result<(), CoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        transition(&tx, id, AnalysisStatus::Failed)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), CoreError> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM analyses WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(CoreError::NotFound(id));
        }
        Ok(())
    }
}
