use clap::Parser;

use dirserve::cli::Cli;
use dirserve::config::Config;
use dirserve::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli)?;

    if cli.print_config {
        print!("{}", cfg.to_toml()?);
        return Ok(());
    }

    logger::init(&cfg)?;

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(server::run(cfg))
}
