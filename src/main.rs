use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_session::{create_router, AppState, Config, SessionController, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interview-session", version, about = "Voice/video interview session controller")]
struct Cli {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/interview-session")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Run one session in the terminal: Enter ends a turn, `q` ends the session
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Interview Session v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Voice channel: {}", cfg.server.voice_url()?);

    let controller = SessionController::new(cfg.session.to_session_config(), cfg.collaborators()?);

    match cli.command {
        Command::Serve => serve(&cfg, controller).await,
        Command::Run => run(controller).await,
    }
}

async fn serve(cfg: &Config, controller: SessionController) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    let app = create_router(AppState::new(controller.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    controller.end().await;
    Ok(())
}

async fn run(controller: SessionController) -> Result<()> {
    let mut events = controller.subscribe();
    controller.start().await.context("Failed to start session")?;

    println!("Session started. Press Enter to finish your answer, type q to end.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().eq_ignore_ascii_case("q") => {
                    controller.end().await;
                    break;
                }
                Some(_) => {
                    if !controller.end_recording_turn().await {
                        println!("Not recording right now.");
                    }
                }
                None => {
                    controller.end().await;
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(SessionEvent::Response(text)) => println!("> {}", text),
                Ok(SessionEvent::Status(status)) => info!("{}", status),
                Ok(SessionEvent::Tick { remaining }) if remaining % 60 == 0 => {
                    println!("{} minutes remaining", remaining / 60);
                }
                Ok(SessionEvent::UploadFailed { kind, error }) => warn!("{} upload failed: {}", kind, error),
                Ok(SessionEvent::Ended) => break,
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} session events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                controller.end().await;
                break;
            }
        }
    }

    let stats = controller.stats().await;
    info!(
        "Session finished: {} turns sent, {} replies received",
        stats.turns_sent, stats.replies_received
    );

    Ok(())
}
