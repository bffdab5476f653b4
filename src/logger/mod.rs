//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled diagnostics (error, warn, info, debug)
//! - Verbose request traces
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Local;

use crate::config::Config;

/// Diagnostic severity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    const fn tag(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config.logging.level.parse().map_err(|e: String| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn enabled(level: Level) -> bool {
    level <= writer::get().map_or(Level::Info, writer::LogWriter::level)
}

/// Prefix a diagnostic with a local timestamp and its level
fn stamp(level: Level, message: &str) -> String {
    format!("{} [{level}] {message}", Local::now().format("%Y/%m/%d %H:%M:%S"))
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&stamp(Level::Debug, message));
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(&stamp(Level::Info, message));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&stamp(Level::Warn, message));
    }
}

pub fn log_error(message: &str) {
    write_error(&stamp(Level::Error, message));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

/// Log a verbose request trace block as a single write
pub fn log_trace(block: &str) {
    write_info(block);
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info(&format!("[+] Starting HTTP server on {addr}"));
    write_info(&format!("[+] Serving files at: {}", config.server.directory));
    if config.features.redirect {
        write_info("[+] Dynamic redirects enabled under /redir");
    }
    if config.features.cors {
        write_info("[+] CORS enabled");
    }
    if config.features.verbose {
        write_info("[+] Verbose request tracing enabled");
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_debug(&format!("[Connection] Failed to serve connection: {err}"));
}
