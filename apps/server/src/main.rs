#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use tracing::info;
use uppe_service::Config;
use uppe_service::database::open_store;
use uppe_service::monitoring::{MonitoringScheduler, NetworkProber, Updater};

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use state::AppState;

/// Endpoint reachability and registration exporter
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/uppe/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Database file, or `:memory:`; overrides the config file
    #[arg(long)]
    database: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_config(cli.config.as_ref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    info!("{}", config);

    let store = open_store(&config.database.path).await?;
    let state = AppState::new(store).await?;

    let prober = Arc::new(NetworkProber::new(&config.monitoring));
    let updater = Arc::new(Updater::new(state.store.clone(), prober, state.registry.clone()));
    MonitoringScheduler::new(updater, config.monitoring.interval()).spawn();
    info!("Monitoring every {}s", config.monitoring.interval().as_secs());

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    run_server(addr, state).await
}

async fn run_server(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    info!("Listening on http://{}", addr);

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
