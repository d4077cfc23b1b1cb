use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use segretario_dvr::api_types::ExtractionSchema;
use segretario_dvr::config::{load_config, resolve_config_path, Config, ExportConfig};
use segretario_dvr::console::{parse_line, ConsoleCommand};
use segretario_dvr::extract::ExtractionClient;
use segretario_dvr::image::{encode_image_file, EncodedImage};
use segretario_dvr::render::{render, ExportFormat};
use segretario_dvr::replay::replay_lines;
use segretario_dvr::session::{Session, TurnSummary};
use segretario_dvr::TurnError;

/// Segretario DVR - voice-driven workplace inspection assistant
#[derive(Parser, Debug)]
#[command(name = "segretario", version, about, long_about = None)]
struct Args {
    /// Path to config file (overrides DVR_CONFIG environment variable)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Export format (default: export.format from config, else markdown)
    #[arg(long, global = true, value_enum)]
    format: Option<ExportFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session: every stdin line is a dictation turn
    Session {
        /// Directory where the final report is written on exit
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Apply recorded extraction responses (JSON lines) without the network
    Replay {
        file: PathBuf,
        /// Response shape of the recording (default: from config, else flat)
        #[arg(long, value_enum)]
        schema: Option<ExtractionSchema>,
    },
}

fn render_now(session: &Session, export: &ExportConfig, format: ExportFormat) -> Result<String> {
    let now = Utc::now().with_timezone(&export.tz()?);
    Ok(render(session.state(), format, now))
}

fn print_turn(turn: &TurnSummary) {
    if let Some(reply) = &turn.reply {
        println!("{}", reply.trim());
    }
    debug!("Turn {} photo binding: {:?}", turn.seq, turn.binding);
}

async fn run_turn(
    session: &mut Session,
    client: &ExtractionClient,
    transcript: String,
    image: Option<EncodedImage>,
) -> Result<Option<TurnSummary>, TurnError> {
    let ticket = session.begin_turn(transcript, image)?;
    let request = ticket.request();

    tokio::select! {
        res = client.extract(&request) => match res {
            Ok(body) => session.complete_turn(&ticket, &body).map(Some),
            Err(e) => {
                session.fail_turn(&ticket);
                Err(e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            session.cancel_turn();
            warn!("Turn {} cancelled by user", ticket.seq());
            Ok(None)
        }
    }
}

async fn run_session(cfg: Config, format: ExportFormat, output_dir: Option<PathBuf>) -> Result<()> {
    let client = ExtractionClient::new(&cfg.extraction)?;
    let mut session = Session::new(cfg.extraction.schema);
    let mut next_image: Option<EncodedImage> = None;

    info!(
        "Session started - endpoint={}, schema={:?}",
        cfg.extraction.endpoint, cfg.extraction.schema
    );
    println!("Buongiorno. Mi dica quale area, macchinario o mansione vuole ispezionare.");

    // Ctrl-C at the prompt ends the session like /quit
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted at prompt, closing session");
                break;
            }
        };
        match parse_line(&line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => break,
            ConsoleCommand::Report => println!("{}", render_now(&session, &cfg.export, format)?),
            ConsoleCommand::Reset => {
                session.reset();
                next_image = None;
                println!("Report svuotato.");
            }
            ConsoleCommand::Photo(path) => match encode_image_file(&path) {
                Ok(img) => {
                    next_image = Some(img);
                    println!("Foto pronta per il prossimo rilievo.");
                }
                Err(e) => eprintln!("Impossibile caricare l'immagine: {e}"),
            },
            ConsoleCommand::WorkplacePhoto { name, path } => {
                let added = encode_image_file(&path)
                    .and_then(|img| session.add_workplace_photo(&name, img.to_data_url()));
                match added {
                    Ok(n) => println!("Foto aggiunta a {name} ({n} in totale)."),
                    Err(e) => eprintln!("Errore: {e}"),
                }
            }
            ConsoleCommand::Unknown(cmd) => eprintln!("Comando sconosciuto: {cmd}"),
            ConsoleCommand::Dictation(text) => {
                match run_turn(&mut session, &client, text, next_image.take()).await {
                    Ok(Some(turn)) => print_turn(&turn),
                    Ok(None) => println!("Rilievo annullato."),
                    Err(e) if e.is_retryable() => {
                        error!("Extraction failed - error={}", e);
                        eprintln!("Impossibile contattare il servizio di elaborazione. Riprova.");
                    }
                    Err(e) => {
                        error!("Turn rejected - error={}", e);
                        eprintln!("Si è verificato un errore: {e}");
                    }
                }
            }
        }
    }

    if let Some(dir) = output_dir {
        write_export(&dir, &session, &cfg.export, format)?;
    }
    info!("Session ended - has_data={}", session.state().has_data());
    Ok(())
}

fn write_export(dir: &Path, session: &Session, export: &ExportConfig, format: ExportFormat) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let ext = match format {
        ExportFormat::Markdown => "md",
        ExportFormat::Text => "txt",
    };
    let path = dir.join(format!("report-dvr-{}.{}", Utc::now().format("%Y%m%d-%H%M%S"), ext));
    std::fs::write(&path, render_now(session, export, format)?)
        .with_context(|| format!("write {}", path.display()))?;
    info!("Report written - path={}", path.display());
    Ok(())
}

fn run_replay(cfg: Option<Config>, format: ExportFormat, file: &Path, schema: Option<ExtractionSchema>) -> Result<()> {
    let schema = schema
        .or_else(|| cfg.as_ref().map(|c| c.extraction.schema))
        .unwrap_or_default();
    let export = cfg.map(|c| c.export).unwrap_or_default();

    let input = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let base_dir = file.parent().unwrap_or_else(|| Path::new("."));

    let mut session = Session::new(schema);
    let summary = replay_lines(&mut session, &input, base_dir);
    for (line, reason) in &summary.dropped {
        eprintln!("line {}: turn dropped: {}", line, reason);
    }
    print!("{}", render_now(&session, &export, format)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs to stderr, stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Session { output_dir } => {
            let cfg_path = resolve_config_path(args.config.as_deref(), |k| std::env::var(k).ok());
            debug!("Using config file: {}", cfg_path.display());
            let cfg = load_config(&cfg_path)?;
            let format = args.format.unwrap_or(cfg.export.format);
            run_session(cfg, format, output_dir).await
        }
        Command::Replay { file, schema } => {
            let cfg = match &args.config {
                Some(p) => Some(load_config(p)?),
                None => None,
            };
            let format = args
                .format
                .or_else(|| cfg.as_ref().map(|c| c.export.format))
                .unwrap_or_default();
            run_replay(cfg, format, &file, schema)
        }
    }
}
