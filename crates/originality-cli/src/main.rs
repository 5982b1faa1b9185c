use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use originality_core::highlight::highlight_segments;
use originality_core::poll::wait_for_terminal;
use originality_core::{
    AnalysisStatus, AnalysisStore, AnalysisTrigger, Config, InputType, NewDocument,
    PdfExtractionStatus, Pipeline, RateLimiters, SqliteStore, config_file, process_trigger,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod export;
mod output;

use export::ExportFormat;
use output::ColorMode;

/// Research Originality Analyzer - Compare a research draft against published literature
#[derive(Parser, Debug)]
#[command(name = "originality", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a plain-text research document
    Analyze {
        /// Path to the text file to analyze
        file_path: PathBuf,

        /// Title for the analysis (default: file name)
        #[arg(long)]
        title: Option<String>,

        /// Mark the text as extracted from a PDF with the given extraction outcome
        #[arg(long, value_parser = parse_pdf_status)]
        pdf_status: Option<PdfExtractionStatus>,

        /// Path to the SQLite analysis store (default: in-memory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// API key for the text model gateway
        #[arg(long)]
        api_key: Option<String>,

        /// Text model name
        #[arg(long)]
        model: Option<String>,

        /// Base URL of an OpenAI-compatible chat completions API
        #[arg(long)]
        model_url: Option<String>,

        /// Semantic Scholar API key
        #[arg(long)]
        s2_api_key: Option<String>,

        /// Comma-separated list of literature indices to disable
        #[arg(long, value_delimiter = ',')]
        disable_indices: Vec<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output report file (disables color)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = ExportFormat::Terminal)]
        format: ExportFormat,

        /// Dry run: segment the document and print the search query without
        /// contacting any service
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-render a stored analysis
    Show {
        /// Analysis id
        id: i64,

        /// Path to the SQLite analysis store
        #[arg(long)]
        db: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output report file (disables color)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = ExportFormat::Terminal)]
        format: ExportFormat,
    },
}

fn parse_pdf_status(s: &str) -> Result<PdfExtractionStatus, String> {
    PdfExtractionStatus::parse(s).ok_or_else(|| {
        format!("unknown PDF extraction status '{s}' (expected success, partial or failed)")
    })
}

/// Values given on the command line. Each one overrides the matching
/// environment variable and config file entry.
#[derive(Debug, Default)]
struct ConfigFlags {
    api_key: Option<String>,
    model: Option<String>,
    model_url: Option<String>,
    s2_api_key: Option<String>,
    db: Option<PathBuf>,
    disable_indices: Vec<String>,
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(flags: ConfigFlags) -> Config {
    let mut config = config_file::resolve_config();
    apply_flags(flags, &mut config);
    config
}

fn apply_flags(flags: ConfigFlags, config: &mut Config) {
    if let Some(key) = flags.api_key {
        config.model_api_key = Some(key);
    }
    if let Some(model) = flags.model {
        config.model_name = model;
    }
    if let Some(url) = flags.model_url {
        config.model_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = flags.s2_api_key {
        config.s2_api_key = Some(key);
        config.rate_limiters = Arc::new(RateLimiters::new(true));
    }
    if let Some(db) = flags.db {
        config.store_path = Some(db);
    }
    if !flags.disable_indices.is_empty() {
        config.disabled_indices = flags.disable_indices;
    }
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    Ok(match &config.store_path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    })
}

fn open_writer(output: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            file_path,
            title,
            pdf_status,
            db,
            api_key,
            model,
            model_url,
            s2_api_key,
            disable_indices,
            no_color,
            output,
            format,
            dry_run,
        } => {
            let text = read_document(&file_path)?;
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file_path.display().to_string());
            let color = ColorMode(!no_color && output.is_none());
            let mut writer = open_writer(output.as_deref())?;

            if dry_run {
                return dry_run_analysis(&text, &file_name, &mut writer, color);
            }

            let config = resolve_config(ConfigFlags {
                api_key,
                model,
                model_url,
                s2_api_key,
                db,
                disable_indices,
            });
            let doc = NewDocument {
                title: title.unwrap_or(file_name),
                input_type: if pdf_status.is_some() {
                    InputType::Pdf
                } else {
                    InputType::Text
                },
                text,
                pdf_extraction_status: pdf_status.unwrap_or(PdfExtractionStatus::NotApplicable),
            };
            analyze(doc, config, &mut writer, format, color).await
        }
        Command::Show {
            id,
            db,
            no_color,
            output,
            format,
        } => {
            let config = resolve_config(ConfigFlags {
                db,
                ..Default::default()
            });
            if config.store_path.is_none() {
                anyhow::bail!(
                    "No analysis store configured. Pass --db <path> or set ORIGINALITY_DB."
                );
            }
            let store = open_store(&config)?;
            let color = ColorMode(!no_color && output.is_none());
            let mut writer = open_writer(output.as_deref())?;
            render_stored(&store, id, &mut writer, format, color)
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        anyhow::bail!("File is empty: {}", path.display());
    }
    Ok(text)
}

fn dry_run_analysis(
    text: &str,
    file_name: &str,
    writer: &mut Box<dyn Write>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let segmented = originality_parsing::split_references(text);
    let query = originality_parsing::build_search_query(&segmented.body_text);
    output::print_dry_run(writer, file_name, &segmented, &query, color)?;
    Ok(())
}

async fn analyze(
    doc: NewDocument,
    config: Config,
    writer: &mut Box<dyn Write>,
    format: ExportFormat,
    color: ColorMode,
) -> anyhow::Result<()> {
    tracing::debug!(?config, "resolved configuration");

    let store = Arc::new(open_store(&config)?);
    let id = store.create(&doc)?;
    let pipeline = Arc::new(Pipeline::from_config(&config));
    let trigger = AnalysisTrigger::new(id, doc.text, doc.pdf_extraction_status);

    let interrupted = CancellationToken::new();
    let ctrl_c = interrupted.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Analyzing \"{}\"...", doc.title));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = run_analysis(
        Arc::clone(&store),
        id,
        pipeline,
        trigger,
        config.pipeline_timeout(),
        config.poll_interval(),
        interrupted,
    )
    .await;
    spinner.finish_and_clear();
    result?;

    render_stored(store.as_ref(), id, writer, format, color)
}

/// Run one analysis in the background and poll its status until it ends or
/// `interrupted` fires.
async fn run_analysis(
    store: Arc<SqliteStore>,
    id: i64,
    pipeline: Arc<Pipeline>,
    trigger: AnalysisTrigger,
    timeout: Duration,
    poll_interval: Duration,
    interrupted: CancellationToken,
) -> anyhow::Result<()> {
    // Stops polling on interrupt, or when the analysis task ends for any reason.
    let stop = interrupted.child_token();

    let job = {
        let store = Arc::clone(&store);
        let guard = stop.clone().drop_guard();
        tokio::spawn(async move {
            let _guard = guard;
            process_trigger(store.as_ref(), &pipeline, &trigger, timeout).await
        })
    };

    let polled = wait_for_terminal(store.as_ref(), id, poll_interval, &stop).await?;

    if polled.is_none() && interrupted.is_cancelled() {
        job.abort();
        anyhow::bail!("Interrupted; analysis {id} was not completed");
    }

    if let Err(e) = job.await? {
        let status = store.status(id).unwrap_or(AnalysisStatus::Failed);
        anyhow::bail!("Analysis {id} {}: {e}", status.as_str());
    }
    Ok(())
}

fn render_stored(
    store: &dyn AnalysisStore,
    id: i64,
    writer: &mut Box<dyn Write>,
    format: ExportFormat,
    color: ColorMode,
) -> anyhow::Result<()> {
    let record = store.get(id)?;
    let segments = highlight_segments(record.display_text(), &record.matches);

    match format {
        ExportFormat::Terminal => output::print_report(writer, &record, &segments, color)?,
        other => writer.write_all(export::render(&record, &segments, other)?.as_bytes())?,
    }
    writer.flush()?;
    Ok(())
}
