// Server loop module
// Accepts connections until a shutdown signal, then drains in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::Instant;

use super::connection::accept_connection;
use super::listener::create_listener;
use super::signal::{start_signal_handler, SignalHandler};
use crate::config::Config;
use crate::logger;

/// How often the drain checks the connection counter
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bind, serve and shut down gracefully
///
/// Must be called inside a Tokio runtime; connections run on a `LocalSet`.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let listener = create_listener(addr)?;
    logger::log_server_start(&listener.local_addr()?, &config);

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals))?;

    let config = Arc::new(config);
    let active_connections = Arc::new(AtomicUsize::new(0));

    let local = tokio::task::LocalSet::new();
    local
        .run_until(serve(listener, Arc::clone(&config), Arc::clone(&active_connections), &signals))
        .await;

    let grace = Duration::from_secs(config.performance.shutdown_timeout);
    // Connections are local tasks, so the LocalSet has to keep running while we wait
    let remaining = local.run_until(drain(&active_connections, grace)).await;
    if remaining > 0 {
        logger::log_warning(&format!(
            "Shutdown timeout reached with {remaining} connection(s) still open"
        ));
    }
    logger::log_info("Server stopped");
    Ok(())
}

/// Accept loop, returns once shutdown is requested
#[allow(clippy::ignored_unit_patterns)]
async fn serve(
    listener: TcpListener,
    config: Arc<Config>,
    active_connections: Arc<AtomicUsize>,
    signals: &SignalHandler,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &config, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = signals.shutdown.notified() => {
                logger::log_info(&format!(
                    "Stopped accepting, {} connection(s) in flight",
                    active_connections.load(Ordering::SeqCst)
                ));
                return;
            }
        }
    }
}

/// Wait until no connection is active or `grace` has passed
///
/// Returns the number of connections still open.
async fn drain(active_connections: &AtomicUsize, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 || Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
