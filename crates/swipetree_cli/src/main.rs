//! Interactive terminal driver for the navigation engine.
//!
//! # Responsibility
//! - Wire config, probe backend, metadata database and logging from flags.
//! - Feed stdin commands into the engine and print the resulting view.
//!
//! # Invariants
//! - Bad input lines are reported and skipped; only setup failures exit
//!   non-zero.

mod command;

use async_trait::async_trait;
use clap::Parser;
use command::{parse_command, Command, HELP};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use swipetree_core::service::location::{
    start_id_from_location, start_id_from_prompt, LocationReflector,
};
use swipetree_core::service::navigation::ArtifactStatus;
use swipetree_core::{
    default_log_level, init_logging_with, open_db, open_db_in_memory, DirectoryExistenceProbe,
    DispatchOutcome, EditResult, EngineConfig, ExistenceProbe, HttpExistenceProbe, HttpLabelSync,
    Identifier, LogSettings, NavigationEngine, PersonMeta, SoftEditor, SqliteMetaRepository,
    SyncStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "swipetree", version, about = "Walk a numeric family tree from the terminal")]
struct Args {
    /// Engine settings (TOML). Defaults apply when omitted.
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,
    /// Local directory holding `<id>.<ext>` photos.
    #[arg(long, value_name = "DIR", conflicts_with = "base_url", required_unless_present = "base_url")]
    images: Option<PathBuf>,
    /// Base URL serving `<id>.<ext>` photos.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Metadata database file; in-memory when omitted.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Directory for rolling log files; logging is off when omitted.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Start identifier, e.g. `140000`.
    #[arg(long, env = "SWIPETREE_START", conflicts_with = "location")]
    start: Option<String>,
    /// Page URL carrying `#id=...` or `?id=...`.
    #[arg(long, value_name = "URL")]
    location: Option<String>,
    /// Remote label-commit endpoint.
    #[arg(long, value_name = "URL")]
    label_endpoint: Option<String>,
}

enum ArtifactProbe {
    Directory(DirectoryExistenceProbe),
    Http(HttpExistenceProbe),
}

#[async_trait]
impl ExistenceProbe for ArtifactProbe {
    async fn probe(&self, id: &Identifier) -> bool {
        match self {
            Self::Directory(probe) => probe.probe(id).await,
            Self::Http(probe) => probe.probe(id).await,
        }
    }
}

/// Answers long presses with the edit queued by the last `edit` line.
struct QueuedEditor {
    pending: Arc<Mutex<Option<PersonMeta>>>,
}

#[async_trait]
impl SoftEditor for QueuedEditor {
    async fn request_edit(&self, _id: &Identifier, _current: &PersonMeta) -> EditResult {
        let queued = self.pending.lock().ok().and_then(|mut slot| slot.take());
        match queued {
            Some(meta) => EditResult::Saved(meta),
            None => EditResult::Cancelled,
        }
    }
}

struct StdoutReflector;

impl LocationReflector for StdoutReflector {
    fn replace_fragment(&mut self, fragment: &str) {
        println!("location #{fragment}");
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> CliResult<()> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        let level = args.log_level.as_deref().unwrap_or(default_log_level());
        init_logging_with(LogSettings::new(level, absolute(log_dir)?)?.with_stderr_mirror())?;
    }

    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    let probe = match (&args.images, &args.base_url) {
        (Some(root), _) => ArtifactProbe::Directory(DirectoryExistenceProbe::new(
            root.clone(),
            config.artifact_extension.clone(),
        )),
        (None, Some(base_url)) => ArtifactProbe::Http(HttpExistenceProbe::new(
            base_url.clone(),
            config.artifact_extension.clone(),
        )),
        (None, None) => return Err("either --images or --base-url is required".into()),
    };

    let conn = match args.db.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let store = SqliteMetaRepository::new(&conn, config.meta_namespace.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let start = match resolve_start(&args) {
        Some(start) => start,
        None => prompt_start(&mut lines).await?,
    };

    let pending = Arc::new(Mutex::new(None));
    let mut engine = NavigationEngine::new(config, probe, store, &start)?
        .with_soft_editor(Box::new(QueuedEditor {
            pending: Arc::clone(&pending),
        }))
        .with_location_reflector(Box::new(StdoutReflector));
    if let Some(endpoint) = args.label_endpoint {
        engine = engine.with_remote_sync(Box::new(HttpLabelSync::new(endpoint)));
    }

    info!("event=cli_start module=cli status=ok start={}", engine.anchor());
    engine.refresh_anchor().await;
    render(&engine);

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Show => render(&engine),
            Command::Go(raw) => match engine.jump_to(&raw) {
                Ok(ticket) => {
                    let load = engine.load_anchor(ticket).await;
                    engine.apply_anchor(load);
                    render(&engine);
                }
                Err(err) => eprintln!("cannot jump to `{raw}`: {err}"),
            },
            Command::Edit(meta) => {
                if let Ok(mut slot) = pending.lock() {
                    *slot = meta;
                }
                let outcome = engine.dispatch(swipetree_core::Intent::LongPress).await;
                report(&engine, outcome);
            }
            Command::Intent(intent) => {
                let outcome = engine.dispatch(intent).await;
                report(&engine, outcome);
            }
        }
    }
    info!(
        "event=cli_exit module=cli status=ok anchor={} history_len={}",
        engine.anchor(),
        engine.history().len()
    );
    Ok(())
}

fn resolve_start(args: &Args) -> Option<String> {
    if let Some(start) = args.start.as_deref() {
        return start_id_from_prompt(start);
    }
    let url = args.location.as_deref()?;
    let (before_fragment, fragment) = url.split_once('#').unwrap_or((url, ""));
    let query = before_fragment
        .split_once('?')
        .map_or("", |(_, query)| query);
    start_id_from_location(fragment, query)
}

async fn prompt_start(lines: &mut Lines<BufReader<Stdin>>) -> CliResult<String> {
    loop {
        println!("start id:");
        let Some(line) = lines.next_line().await? else {
            return Err("no start identifier given".into());
        };
        if let Some(start) = start_id_from_prompt(&line) {
            return Ok(start);
        }
    }
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn report<P, S>(
    engine: &NavigationEngine<P, S>,
    outcome: swipetree_core::NavResult<DispatchOutcome>,
) where
    P: ExistenceProbe,
    S: swipetree_core::MetadataStore,
{
    match outcome {
        Ok(DispatchOutcome::Ignored) => println!("(no change)"),
        Ok(DispatchOutcome::EditCancelled) => println!("edit cancelled"),
        Ok(DispatchOutcome::MetadataSaved(status)) => {
            match status {
                SyncStatus::LocalOnly => println!("saved locally"),
                SyncStatus::Synced => println!("saved and synced"),
                SyncStatus::Failed(err) => println!("saved locally; sync failed: {err}"),
            }
            render(engine);
        }
        Ok(_) => render(engine),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn render<P, S>(engine: &NavigationEngine<P, S>)
where
    P: ExistenceProbe,
    S: swipetree_core::MetadataStore,
{
    let view = engine.anchor_view();
    let status = match view.status {
        ArtifactStatus::Pending => "pending",
        ArtifactStatus::Found => "found",
        ArtifactStatus::Missing => "missing",
    };
    println!(
        "anchor {} [{}] {} {} (history {})",
        view.id,
        status,
        view.artifact_ref,
        quoted(&view.display_name),
        engine.history().len()
    );

    if let Some(grid) = engine.grid() {
        println!("grid {:?}: {} tile(s)", grid.kind, grid.cards.len());
        for (index, card) in grid.cards.iter().enumerate() {
            let marker = if card.placeholder { " (placeholder)" } else { "" };
            println!(
                "  {index}) {} {}{marker}",
                card.id,
                quoted(&card.display_name)
            );
        }
    }
}

fn quoted(label: &str) -> String {
    if label.is_empty() {
        String::new()
    } else {
        format!("\"{label}\"")
    }
}
