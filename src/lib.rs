#![forbid(unsafe_code)]

pub mod adapters;
pub mod app;
pub mod commands;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod ports;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{info, warn};

use app::{AppController, ControllerOptions};
use commands::{execute, parse_command, Command};
use domain::CaptureBackend;

#[derive(Parser)]
#[command(name = "camtune")]
#[command(about = "Tune webcam focus, zoom and image settings, then script them", long_about = None)]
struct Cli {
    /// Directory holding config.toml and logs (defaults to the OS config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Capture backend for this run (simulated or v4l2)
    #[arg(long)]
    backend: Option<CaptureBackend>,
    /// Log level for this run (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize the application controller
    let controller = AppController::new(ControllerOptions {
        config_dir: cli.config_dir,
        backend: cli.backend,
        log_level: cli.log_level,
    })
    .context("Failed to initialize application")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(control_panel(Arc::new(controller)))
}

/// Read commands from stdin until `quit`, EOF or Ctrl-C, then release the camera.
async fn control_panel(controller: Arc<AppController>) -> anyhow::Result<()> {
    let mut events = controller.session().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("event: {}", json),
                    Err(e) => warn!(error = %e, "Failed to render session event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!(
        config = %controller.config_path(),
        logs = %controller.logs_dir(),
        "Control panel ready"
    );
    println!("CamTune control panel. Type 'help' for commands.");
    match execute(&controller, Command::Devices).await {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("error: {}", e),
    }

    // Each command runs on its own task; this loop only polls input and Ctrl-C.
    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut drain = false;
    let result = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        drain = true;
                        break Ok(());
                    }
                    Err(e) => break Err(anyhow::Error::new(e).context("Failed to read input")),
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break Ok(()),
                    Ok(Some(command)) => {
                        let controller = Arc::clone(&controller);
                        tasks.spawn(async move {
                            match execute(&controller, command).await {
                                Ok(out) => println!("{}", out),
                                Err(e) => eprintln!("error: {}", e),
                            }
                        });
                    }
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Command task failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Ok(());
            }
        }
    };

    // End of piped input lets outstanding commands finish; quit and Ctrl-C do not.
    if drain {
        tokio::select! {
            _ = async { while tasks.join_next().await.is_some() {} } => {}
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
    }
    tasks.abort_all();
    controller.shutdown();
    printer.abort();
    result
}
