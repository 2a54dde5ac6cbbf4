use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use subnx::errors::exit_with_error;
use subnx::extract::run;
use subnx::options::Options;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_target(false)
        .init();
}

fn try_main() -> Result<()> {
    let opts = Options::parse();
    init_logging();
    debug!("{:?}", opts);

    opts.validate()?;
    run(&opts).with_context(|| format!("Failed to extract taxon {}", opts.taxid))?;
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        exit_with_error(&e);
    }
}
