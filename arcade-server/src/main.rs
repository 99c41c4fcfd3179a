use std::sync::Arc;

use arcade_db::ArcadeDb;
use arcade_env::Config;
use arcade_server::checkout::FakeCheckoutProvider;
use arcade_server::mail::LoggingMailSender;
use arcade_server::server::run_server;
use arcade_server::state::AppState;
use clap::{arg, Command};

fn cli() -> Command {
    Command::new("arcade-server")
        .about("Authoritative run backend for the arcade game.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("serve").arg(arg!(--port <port> "Override the configured port")))
        .subcommand(Command::new("init-db").about("Create the database file and its schema, then exit"))
}

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .init();
}

async fn serve(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(port) = port_override {
        config.port = port;
    }
    config.validate()?;
    init_tracing(&config);

    let db = ArcadeDb::try_new(&config.database_path)?;
    let checkout_base_url = config.public_base_url.clone();
    let state = AppState::new(
        db,
        config,
        Arc::new(LoggingMailSender),
        Arc::new(FakeCheckoutProvider { base_url: checkout_base_url }),
    );

    run_server(state).await
}

fn init_db() -> anyhow::Result<()> {
    let config = Config::from_env();
    ArcadeDb::try_new(&config.database_path)?;
    println!("Initialized database at {}", config.database_path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("serve", sub)) => {
            let port = sub.get_one::<String>("port").and_then(|s| s.parse::<u16>().ok());
            serve(port).await
        }
        Some(("init-db", _)) => init_db(),
        _ => unreachable!(),
    }
}
