//! hfpgw - HFP audio gateway bridge for oFono
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use hfpgw_app::config::load_settings;
use hfpgw_core::prelude::*;

/// hfpgw - HFP audio gateway bridge for oFono
#[derive(Parser, Debug)]
#[command(name = "hfpgw")]
#[command(
    about = "Bridges HFP audio gateway requests to oFono over an NDJSON stream",
    long_about = None
)]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// AG feature bits to disable (decimal or 0x-prefixed hex)
    #[arg(long, value_name = "MASK", value_parser = parse_mask)]
    disable_features: Option<u32>,

    /// Supplementary feature bits to disable (decimal or 0x-prefixed hex)
    #[arg(long, value_name = "MASK", value_parser = parse_mask)]
    disable_supp_features: Option<u32>,

    /// File holding the number used for redial
    #[arg(long, value_name = "PATH")]
    last_number_path: Option<PathBuf>,
}

fn parse_mask(s: &str) -> std::result::Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid feature mask '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // stdout carries the bridge protocol, so logs go to file
    let log_dir = hfpgw_core::logging::init()?;
    info!(
        "hfpgw {} starting, logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );

    let mut settings = load_settings(args.config.as_deref());
    if let Some(mask) = args.disable_features {
        settings.features.disabled = mask;
    }
    if let Some(mask) = args.disable_supp_features {
        settings.features.disabled_supplementary = mask;
    }
    if let Some(path) = args.last_number_path {
        settings.dial.last_number_path = Some(path);
    }
    debug!("Settings: {:?}", settings);

    let result = hfpgw::run_headless(settings).await;
    if let Err(ref e) = result {
        error!("Gateway error: {:?}", e);
    }
    Ok(result?)
}
