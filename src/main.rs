use actix_web::HttpServer;
use env_logger::Env;
use std::io;

use todo_api::{build_app, AppContext, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let context = AppContext::from_config(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    log::info!(
        "Starting todo-api at {} ({:?})",
        config.server_url(),
        config.environment
    );
    HttpServer::new(move || build_app(&context))
        .bind((config.server_host.as_str(), config.server_port))?
        .run()
        .await
}
