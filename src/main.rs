use std::{error::Error, net::SocketAddr, sync::Arc};

use foodgram_sdk::{
    api::{routes::routes, state::State},
    catalog::seed_ingredients,
    config::Config,
    jwt::SessionSigner,
    postgres::PgStore,
};
use log::{error, info};
use tokio::signal::ctrl_c;

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    info!("Connecting to database...");
    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    store.init_schema().await?;

    if let Some(path) = &config.ingredients_file {
        seed_ingredients(&store, path).await?;
    }

    let sessions = SessionSigner::new(&config.jwt_secret, config.session_lifetime_hours)?;
    let state = State::new(Arc::new(store), sessions);

    let address = SocketAddr::new(config.host, config.port);
    let (address, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(address, shutdown_signal())?;
    info!("Server running on {address}");

    server.await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}
