mod auth;
mod config;
mod db;
mod error;
mod models;
mod orders;
mod principals;
mod rating;
mod roles;
mod routes;
mod schedule;
mod slots;
mod state;
#[cfg(test)]
mod testing;

use actix_web::{middleware, web, App, HttpServer};

use crate::{config::AppConfig, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env();
    db::ensure_sqlite_dir(&config.database_url)?;

    let pool = db::connect(&config.database_url, config.max_connections).await?;
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool, &config).await?;

    let state = AppState {
        db: pool.clone(),
        horizon_days: config.horizon_days,
    };

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting studio booking service on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(routes::json_config())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
