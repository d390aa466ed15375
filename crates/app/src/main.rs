use std::process;

use tracing_subscriber::filter::LevelFilter;

mod headless;
mod logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        headless::print_headless_help();
        return;
    }

    let level = match log_level_arg(&args) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("fuser: {err}");
            process::exit(2);
        }
    };
    let _log_level_state = logging::setup_tracing(level);
    tracing::info!("fuser starting");

    if let Err(err) = headless::run(&args) {
        tracing::error!("headless: {err}");
        eprintln!("fuser: {err}");
        process::exit(1);
    }
}

fn log_level_arg(args: &[String]) -> Result<LevelFilter, String> {
    let Some(pos) = args.iter().position(|arg| arg == "--log-level") else {
        return Ok(LevelFilter::INFO);
    };
    let value = args
        .get(pos + 1)
        .ok_or_else(|| "--log-level requires a value".to_string())?;
    logging::parse_level(value)
}
