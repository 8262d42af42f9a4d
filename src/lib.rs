//! Digital menu builder backend.
//!
//! Restaurant owners create menus (sections, items, prices, bilingual text,
//! images and 3D models), edit them behind a session, and share a published
//! menu publicly through its slug.

use std::{str::FromStr, time::Duration};

use actix_files::Files;
use actix_web::web::{self, Data};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod price;
pub mod routes;
pub mod structs;
pub mod upload;
pub mod utils;

use errors::AppError;
use upload::UploadSettings;

/// Per-process handles shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub uploads: UploadSettings,
    /// Shared with the identity provider; sign-in callbacks are refused while unset.
    pub identity_callback_secret: Option<String>,
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    SqlitePool::connect_with(opts).await
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Registers shared state, extractor configuration and every route.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let upload_dir = state.uploads.dir.clone();
        cfg.app_data(Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::BadPayload(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|_err, _req| AppError::NotFound.into()))
            .service(routes::auth_callback_handler)
            .service(routes::current_user_handler)
            .service(routes::logout_handler)
            .service(routes::templates_handler)
            .service(routes::list_menus_handler)
            .service(routes::create_menu_handler)
            .service(routes::get_menu_handler)
            .service(routes::update_menu_handler)
            .service(routes::delete_menu_handler)
            .service(routes::public_menu_handler)
            .service(routes::create_section_handler)
            .service(routes::update_section_handler)
            .service(routes::delete_section_handler)
            .service(routes::create_item_handler)
            .service(routes::update_item_handler)
            .service(routes::delete_item_handler)
            .service(upload::upload_handler)
            .service(Files::new("/uploads", upload_dir));
    }
}
