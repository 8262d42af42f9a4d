use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    http::Method,
    middleware,
    web, App, HttpResponse, HttpServer, ResponseError,
};
use log::info;

use menu_builder::{
    config::Config, configure, connect, errors::AppError, migrate, upload::UploadSettings,
    AppState,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        log::error!("FATAL: {}", e);
        std::io::Error::from(e)
    })?;

    let db_pool = connect(&config.database_url)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    migrate(&db_pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    info!("Database migrated successfully");

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState {
        db_pool: db_pool.clone(),
        uploads: UploadSettings {
            dir: config.upload_dir.clone(),
            max_bytes: config.max_upload_bytes,
        },
        identity_callback_secret: Some(config.identity_callback_secret.clone()),
    };
    let session_key = Key::from(config.session_key.as_bytes());
    let secure_cookies = config.secure_cookies;

    info!("Starting HTTP server on http://{}:{}/", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(secure_cookies)
                    .build(),
            )
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .configure(configure(state.clone()))
            .default_service(web::to(default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    db_pool.close().await;
    info!("Database pool closed");
    Ok(())
}

async fn default_handler(req_method: Method) -> HttpResponse {
    match req_method {
        Method::GET => AppError::NotFound.error_response(),
        _ => HttpResponse::MethodNotAllowed().finish(),
    }
}
