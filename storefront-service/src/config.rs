use std::env;
use std::fmt;
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3333;
const DEFAULT_UPLOAD_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_MEDIA_FOLDER: &str = "products";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub password_hash_cost: u32,
    pub media: MediaConfig,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

#[derive(Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_base_url: String,
    pub folder: String,
}

impl fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("upload_base_url", &self.upload_base_url)
            .field("folder", &self.folder)
            .finish()
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    load_from(|key| env::var(key).ok())
}

/// Builds the configuration from an arbitrary variable source.
pub fn load_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

    let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = var("PORT")
        .map(|value| value.parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(DEFAULT_PORT);
    let database_url = var("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
    let jwt_secret = var("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set and non-empty"))?;
    let password_hash_cost = var("PASSWORD_HASH_COST")
        .map(|value| value.parse::<u32>())
        .transpose()
        .context("Failed to parse PASSWORD_HASH_COST")?
        .unwrap_or(common_crypto::DEFAULT_HASH_COST);
    if password_hash_cost == 0 {
        return Err(anyhow!("PASSWORD_HASH_COST must be at least 1"));
    }

    let media = MediaConfig {
        cloud_name: var("MEDIA_CLOUD_NAME").unwrap_or_default(),
        api_key: var("MEDIA_API_KEY").unwrap_or_default(),
        api_secret: var("MEDIA_API_SECRET").unwrap_or_default(),
        upload_base_url: var("MEDIA_UPLOAD_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPLOAD_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string(),
        folder: var("MEDIA_FOLDER").unwrap_or_else(|| DEFAULT_MEDIA_FOLDER.to_string()),
    };

    let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
        .map(|value| parse_origins(&value))
        .unwrap_or_default();

    Ok(ServiceConfig {
        host,
        port,
        database_url,
        jwt_secret,
        password_hash_cost,
        media,
        cors_allowed_origins,
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(normalize_optional)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = load_from(source(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3333);
        assert_eq!(cfg.password_hash_cost, 8);
        assert_eq!(cfg.media.folder, "products");
        assert_eq!(cfg.media.upload_base_url, "https://api.cloudinary.com/v1_1");
        assert!(cfg.cors_allowed_origins.is_empty());
        assert_eq!(cfg.bind_addr().unwrap().port(), 3333);
    }

    #[test]
    fn blank_jwt_secret_is_rejected() {
        let err = load_from(source(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = load_from(source(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" https://a.test, ,https://b.test "),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
    }

    #[test]
    fn media_secret_is_redacted() {
        let cfg = load_from(source(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", "s3cret"),
            ("MEDIA_API_SECRET", "topsecret"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", cfg.media);
        assert!(!rendered.contains("topsecret"));
    }
}
