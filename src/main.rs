// src/main.rs

use livecap::{cli, config, effective_log_dir, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("livecap error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = config::load_and_validate(&args.config)?;
    let log_dir = effective_log_dir(&args, &cfg);
    let _log_guard = logging::init_logging(args.log_level, log_dir.as_deref())?;
    run(args, cfg).await
}
