use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use mime::Mime;
use tokio_postgres::NoTls;

const DEFAULT_FILES_PATH: &str = "uploads/files";
const DEFAULT_POST_MIME_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);

    let pool_cfg = cfg.pool.get_or_insert_with(PoolConfig::default);
    pool_cfg.max_size = 16;

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("failed to create postgres pool")
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub files_path: PathBuf,
    pub post_mime_types: Vec<Mime>,
    pub jwt_secret: String,
    pub store_timeout: Duration,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let files_path = env::var("FILES_PATH").unwrap_or_else(|_| DEFAULT_FILES_PATH.to_string());
        let post_mime_types = parse_mime_types(
            &env::var("POST_MIME_TYPES").unwrap_or_else(|_| DEFAULT_POST_MIME_TYPES.to_string()),
        )?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is empty");
        }

        let store_timeout = match env::var("STORE_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid STORE_TIMEOUT_SECS: {}", v))?,
            Err(_) => DEFAULT_STORE_TIMEOUT_SECS,
        };

        // Railway and similar hosts inject PORT
        let port = match env::var("PORT") {
            Ok(v) => v.trim().parse::<u16>().with_context(|| format!("invalid PORT: {}", v))?,
            Err(_) => 8080,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".into());

        Ok(Self {
            files_path: PathBuf::from(files_path),
            post_mime_types,
            jwt_secret: jwt_secret.trim().to_string(),
            store_timeout: Duration::from_secs(store_timeout),
            port,
            allowed_origins: split_list(&allowed_origins),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_mime_types(raw: &str) -> Result<Vec<Mime>> {
    let types = split_list(raw)
        .iter()
        .map(|s| s.parse::<Mime>().with_context(|| format!("invalid mime type: {}", s)))
        .collect::<Result<Vec<_>>>()?;
    if types.is_empty() {
        bail!("no mime types allowed for post uploads");
    }
    Ok(types)
}
