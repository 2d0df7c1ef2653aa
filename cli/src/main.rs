//! CLI entrypoint for jury-deliberation
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use jury_application::{DeliberationConfig, DeliberationService};
use jury_domain::{DeliberationEvent, SessionId, Severity};
use jury_infrastructure::{ConfigLoader, FileConfig, InMemorySessionStore, ScriptedSpeechGenerator};
use jury_presentation::{
    AppState, Cli, Command, ConsoleFormatter, OutputFormat, TranscriptPrinter, app_router,
};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Session seeded with the configured cast when serving
const DEMO_SESSION: &str = "demo";

type Service = DeliberationService<InMemorySessionStore, ScriptedSpeechGenerator>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; RUST_LOG wins when set
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
    };

    if let Command::Run {
        rounds: Some(rounds),
        ..
    } = &cli.command
    {
        file_config.deliberation.total_rounds = *rounds;
    }

    report_issues(&file_config)?;

    let (deliberation_config, _) = file_config.deliberation.to_deliberation_config();
    let service = Arc::new(build_service(&file_config, deliberation_config));

    match cli.command {
        Command::Serve { bind } => {
            let addr = match bind {
                Some(bind) => bind
                    .parse::<SocketAddr>()
                    .with_context(|| format!("Invalid listen address '{bind}'"))?,
                None => file_config.server.parse_bind().0,
            };
            service
                .store()
                .insert_session(SessionId::from(DEMO_SESSION), file_config.roster())
                .await;
            serve(service, addr).await
        }
        Command::Run {
            skip_after_round,
            output,
            ..
        } => {
            let session = service.store().create_session(file_config.roster()).await;
            run_local(service, session, skip_after_round, output).await
        }
    }
}

/// Log every configuration issue; any error aborts startup.
fn report_issues(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Warning => warn!("{}", issue.message),
            Severity::Error => error!("{}", issue.message),
        }
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("Configuration has {errors} error(s); see the log above");
    }
    Ok(())
}

fn build_service(config: &FileConfig, deliberation: DeliberationConfig) -> Service {
    // === Dependency Injection ===
    let store = Arc::new(InMemorySessionStore::new());

    // Script issues were already reported by validate()
    let (generator, _) =
        ScriptedSpeechGenerator::from_config(&config.effective_jurors(), &config.generator);

    DeliberationService::new(store, Arc::new(generator), deliberation)
}

async fn serve(service: Arc<Service>, addr: SocketAddr) -> Result<()> {
    let app = app_router(AppState::new(service.clone()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let sessions = service.store().session_ids().await;
    info!(addr = %addr, sessions = sessions.len(), "Serving jury deliberation");
    println!("Listening on http://{addr}");
    for session in &sessions {
        println!("  session id: {session}");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// Play `session` to completion, printing each event as it arrives.
///
/// Note windows are advanced at once; with `skip_after_round` the debate is
/// skipped when that round's window opens.
async fn run_local(
    service: Arc<Service>,
    session: SessionId,
    skip_after_round: Option<u32>,
    output: OutputFormat,
) -> Result<()> {
    info!(session = %session, "Starting local deliberation");
    service.start(&session).await?;
    let mut events = service.subscribe(&session).await?;

    let mut printer = TranscriptPrinter::new();
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match output {
            OutputFormat::Pretty => {
                if let Some(text) = printer.render(&event) {
                    print!("{text}");
                    stdout.flush()?;
                }
            }
            OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&event)),
        }

        if event.is_terminal() {
            break;
        }

        if let DeliberationEvent::NoteWindow { round, .. } = event {
            // The controller may be waiting on this stream; reply off the read loop
            let service = service.clone();
            let session = session.clone();
            let skip = skip_after_round == Some(round);
            tokio::spawn(async move {
                let result = if skip {
                    info!(round, "Skipping the rest of the debate");
                    service.skip(&session).await
                } else {
                    service.advance(&session).await
                };
                if let Err(e) = result {
                    warn!(error = %e, "Note window command failed");
                }
            });
        }
    }

    if output == OutputFormat::Pretty {
        let snapshot = service.state(&session).await?;
        println!("{}", ConsoleFormatter::format_snapshot(&snapshot));
    }

    Ok(())
}
