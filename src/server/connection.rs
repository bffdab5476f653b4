// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing the connection limit.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: &Arc<Config>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check, so two racing accepts cannot both slip in
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(config), Arc::clone(conn_counter));
}

/// Serve one connection in a spawned local task.
///
/// The connection as a whole is capped at `write_timeout`; slow request
/// headers are cut off after `read_timeout`. The counter is decremented
/// however the connection ends.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<Config>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let performance = &config.performance;
        let header_timeout = Duration::from_secs(performance.read_timeout);
        let connection_timeout = Duration::from_secs(performance.write_timeout);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(performance.keep_alive_timeout > 0);
        if performance.read_timeout > 0 {
            builder.header_read_timeout(header_timeout);
        }

        let service_config = Arc::clone(&config);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, peer_addr, Arc::clone(&service_config))),
        );

        match tokio::time::timeout(connection_timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_debug(&format!(
                    "[Connection] {peer_addr} closed after {} seconds",
                    connection_timeout.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
