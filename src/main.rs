// src/main.rs

use std::env;
use std::process::ExitCode;

use color_eyre::eyre::Result;

use palisade_rs::core::models::ScanOptions;
use palisade_rs::core::risk;
use palisade_rs::core::scanner;
use palisade_rs::logging;

/// Thin report sink over the engine: one domain argument in, the scan and
/// risk wire shapes out as pretty JSON on stdout.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <domain>", env!("CARGO_PKG_NAME"));
        return Ok(ExitCode::from(2));
    }

    let options = ScanOptions::default();
    let result = scanner::run_scan(&args[1], &options).await?;
    let assessment = risk::assess(&result);

    let report = serde_json::json!({
        "scan": result,
        "risk": assessment,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ExitCode::SUCCESS)
}
