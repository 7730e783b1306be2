pub mod config;
pub mod dispatch;
pub mod graph_core;
pub mod model;
pub mod notify;
pub mod report_store;
pub mod session;
pub mod use_case;

use {
    config::Config,
    session::Session,
    tokio::{
        io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader},
        sync::mpsc,
    },
};

// Re-export the surface consumed by the rendering layer and by tests
pub use dispatch::{Dispatcher, InboundMessage, HANDSHAKE_REQUEST};
pub use graph_core::{Graph, GraphLink, GraphNode};
pub use model::{Report, Transaction};
pub use report_store::ReportStore;
pub use use_case::{GraphElement, UseCase, UseCaseRegistry};

/// Runtime entry point: dispatch newline-delimited JSON frames from stdin,
/// emit outbound messages (handshake, queries) on stdout. The socket
/// transport that would normally carry both sides lives outside this crate.
#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the outbound message stream
    let mut builder = if config.rust_log.is_some() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    } else {
        env_logger::Builder::from_default_env()
    };
    builder.target(env_logger::Target::Stderr).init();

    log::info!("Starting fraudflow");
    log::info!("   WS_URI: {}", config.ws_uri);
    log::info!("   USE_CASE: {}", config.use_case);

    let mut session = Session::new();
    session.set_use_case(&config.use_case)?;

    // Outbound channel: session -> stdout writer task
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(100);
    let writer = tokio::spawn(async move {
        let mut out = stdout();
        while let Some(message) = outbound_rx.recv().await {
            if out.write_all(message.as_bytes()).await.is_err() {
                break;
            }
            if out.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = out.flush().await;
        }
    });

    // Connection establishment: request backlog replay
    session.connect(outbound_tx);

    // Inbound loop: one frame per line, processed in delivery order.
    // A malformed frame is logged and skipped, never fatal.
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match session.handle_raw(&line) {
            Ok(inserted) if inserted > 0 => {
                log::info!("{} reports stored ({} total)", inserted, session.store().count());
            }
            Ok(_) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    log::info!(
        "Inbound stream closed; {} reports accumulated",
        session.store().count()
    );

    drop(session); // releases the outbound sender so the writer task ends
    let _ = writer.await;

    Ok(())
}
