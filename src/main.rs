use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use keepsake::{App, Cli, Config, FileStore, RecordStore};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let store = match FileStore::open(&config.data_dir) {
        Ok(store) => RecordStore::new(store),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(store, config, cli.verbose);
    match app.run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
