//! Browse and edit JSON secrets through a secretgridd server

use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::{
    cli::secret::{self, FilterArgs, LoginArgs, SetArgs},
    cli_args::Config,
};

mod cli_args;
mod cli {
    pub mod common;
    pub mod secret;
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind AWS credentials on the server
    Login(LoginArgs),
    /// Show the flattened secrets
    List(FilterArgs),
    /// Set every selected leaf to the same value
    Set(SetArgs),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login(args) => secret::login(&cli.config, args).await,
        Commands::List(filter) => secret::list(&cli.config, filter).await,
        Commands::Set(args) => secret::set(&cli.config, args).await,
    };

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(1);
    }
}
