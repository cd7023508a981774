// Main entry point - Dependency injection and the acquisition run loop
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::application::analyzer_gateway::AnalyzerGateway;
use crate::application::dashboard_service::DashboardService;
use crate::application::poller::{PollerEvent, SamplePoller};
use crate::domain::buffer::PlotBuffer;
use crate::domain::connection::ConnectionState;
use crate::domain::history::SampleHistory;
use crate::infrastructure::config::load_analyzer_config;
use crate::infrastructure::csv_log::CsvLogWriter;
use crate::infrastructure::webdriver_gateway::WebDriverGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_analyzer_config().context("failed to load analyzer configuration")?;

    // Establish the scripted-browser session (infrastructure layer)
    let gateway = WebDriverGateway::connect(config.connection.clone(), &config.polling)
        .await
        .context("webdriver setup failed")?;

    // Manual login step: the analyzer's login page is open in the browser.
    info!("log in on the analyzer page, then press Enter here to continue");
    wait_for_enter().await?;

    let gateway: Arc<dyn AnalyzerGateway> = Arc::new(gateway);

    // Shared stores (domain layer)
    let plot = Arc::new(RwLock::new(PlotBuffer::new(config.display.plot_capacity)));
    let history = Arc::new(RwLock::new(SampleHistory::new()));

    // Services (application layer)
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let mut poller = SamplePoller::new(
        gateway,
        plot.clone(),
        history.clone(),
        Duration::from_secs(config.polling.interval_secs),
        events_tx,
    );

    let mut log_path: Option<PathBuf> = if config.storage.save_to_csv {
        let writer = CsvLogWriter::for_directory(&config.storage.save_directory);
        let path = writer.path().to_path_buf();
        info!("data will be saved to: {}", path.display());
        poller.set_log_writer(Some(writer));
        Some(path)
    } else {
        info!("csv logging disabled - no data will be saved");
        None
    };

    let dashboard = DashboardService::new(plot, history, config.display.clone());

    poller
        .connect()
        .await
        .context("failed to enter the measurement frame")?;
    let mut state = poller.state();
    let acquiring = poller.acquisition_switch();
    let log_slot = poller.log_writer_slot();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_task = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
        poller
    });

    info!("acquisition running (commands: start, stop, save <dir>, quit)");
    let mut commands = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            maybe_event = events_rx.recv() => match maybe_event {
                Some(PollerEvent::SampleReady(_)) => {
                    let view = dashboard.current_view(state, log_path.as_deref());
                    presentation::console::render(&view);
                }
                Some(PollerEvent::ConnectionLost { reason }) => {
                    state = ConnectionState::Lost;
                    error!("connection lost: {reason}");
                    presentation::console::render(&dashboard.current_view(state, None));
                    break;
                }
                None => break,
            },
            line = commands.next_line() => match line {
                Ok(Some(command)) => match command.trim() {
                    "stop" => {
                        acquiring.store(false, Ordering::Relaxed);
                        info!("acquisition stopped - connection stays open");
                    }
                    "start" => {
                        acquiring.store(true, Ordering::Relaxed);
                        info!("acquisition resumed");
                    }
                    "quit" | "exit" => break,
                    command if command.starts_with("save ") => {
                        let dir = command["save ".len()..].trim();
                        let writer = CsvLogWriter::for_directory(dir);
                        info!("data will be saved to: {}", writer.path().display());
                        log_path = Some(writer.path().to_path_buf());
                        *log_slot.lock().expect("log writer lock poisoned") = Some(writer);
                    }
                    "" => {}
                    other => info!("unknown command '{other}' (start, stop, save <dir>, quit)"),
                },
                _ => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    // Halt the timer, then release the session unless a transport failure
    // already did.
    let _ = shutdown_tx.send(true);
    let mut poller = poll_task.await.context("poller task panicked")?;
    poller.shutdown().await;
    info!("shutdown complete");

    Ok(())
}

async fn wait_for_enter() -> anyhow::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read stdin")?;
    Ok(())
}
