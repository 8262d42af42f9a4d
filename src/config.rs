use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::errors::AppError;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// actix-web's cookie `Key` refuses anything shorter.
const MIN_SESSION_KEY_LEN: usize = 64;

const MIN_CALLBACK_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_key: String,
    pub secure_cookies: bool,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub identity_callback_secret: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let session_key =
            require_secret("SESSION_KEY", env::var("SESSION_KEY"), MIN_SESSION_KEY_LEN)?;
        let identity_callback_secret = require_secret(
            "IDENTITY_CALLBACK_SECRET",
            env::var("IDENTITY_CALLBACK_SECRET"),
            MIN_CALLBACK_SECRET_LEN,
        )?;

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://menu_builder.db")?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "8080")?,
            session_key,
            secure_cookies: try_load("SECURE_COOKIES", "true")?,
            upload_dir: try_load("UPLOAD_DIR", "uploads")?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())?,
            identity_callback_secret,
        })
    }
}

/// A secret that must be present and at least `min_len` bytes long.
fn require_secret(
    key: &str,
    value: Result<String, env::VarError>,
    min_len: usize,
) -> Result<String, AppError> {
    let value = value.map_err(|e| {
        log::error!("FATAL: {key} environment variable not set");
        AppError::EnvVarError(e)
    })?;
    if value.len() < min_len {
        log::error!("FATAL: {key} is shorter than {min_len} bytes");
        return Err(AppError::Config(format!("{key} must be at least {min_len} bytes")));
    }
    Ok(value)
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        log::warn!("Invalid {key} value: {e}");
        AppError::Config(format!("invalid {key}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_fails_closed() {
        let err = require_secret("IDENTITY_CALLBACK_SECRET", Err(env::VarError::NotPresent), 32)
            .unwrap_err();
        assert!(matches!(err, AppError::EnvVarError(_)));
    }

    #[test]
    fn short_secret_is_refused() {
        let err = require_secret("IDENTITY_CALLBACK_SECRET", Ok(String::new()), 32).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(require_secret("IDENTITY_CALLBACK_SECRET", Ok("x".repeat(31)), 32).is_err());
    }

    #[test]
    fn long_enough_secret_is_kept() {
        let secret = "s".repeat(32);
        assert_eq!(require_secret("X", Ok(secret.clone()), 32).unwrap(), secret);
    }
}
