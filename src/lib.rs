//! dirserve: serve a directory over HTTP, with optional dynamic redirects
//! whose target travels in the request itself.

pub mod cli;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod redirect;
pub mod server;
