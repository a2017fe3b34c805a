use std::process::ExitCode;

use clap::Parser;
use farmai_server::cli::Cli;
use farmai_server::{init_tracing, serve, ServerConfig, ServerError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|()| Some(path.clone())),
        None => Ok(dotenvy::dotenv().ok()),
    };
    init_tracing();
    match loaded {
        Ok(Some(path)) => info!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(error) => {
            error!(error = %error, "failed to load env file");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %error, "farmai exited");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), ServerError> {
    let config = cli.apply(ServerConfig::from_env()?);
    serve(config).await
}
