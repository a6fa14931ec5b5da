// src/main.rs
mod config;
mod dtos;
mod handlers;
mod middleware;
mod models;
mod repositories;
mod services;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};

use crate::config::AppConfig;
use crate::middleware::auth_extractor::AuthSettings;
use crate::repositories::file_repository::LocalFileStore;
use crate::repositories::post_repository::PgPostStore;
use crate::services::post_service::{PostService, UploadSettings};

fn mask_key(k: &str) -> String {
    let chars: Vec<char> = k.chars().collect();
    if chars.len() <= 8 { "[REDACTED]".to_string() }
    else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Files path: {}", cfg.files_path.display());
    info!("Post mime types: {:?}", cfg.post_mime_types);
    info!("JWT secret: {}", mask_key(&cfg.jwt_secret));

    let pg_pool = match config::get_pg_pool() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create PG pool: {:#}", e);
            std::process::exit(1);
        }
    };

    let post_store = PgPostStore::new(pg_pool);
    if let Err(e) = post_store.ensure_schema().await {
        error!("Failed to prepare posts table: {}", e);
        std::process::exit(1);
    }

    let posts = PostService::new(
        Arc::new(post_store),
        Arc::new(LocalFileStore::new(cfg.files_path.clone())),
        UploadSettings {
            path: cfg.files_path.clone(),
            mime_types: cfg.post_mime_types.clone(),
        },
        cfg.store_timeout,
    );

    let state = web::Data::new(AppState { posts });
    let auth = web::Data::new(AuthSettings::new(cfg.jwt_secret.clone()));
    let allowed_origins = cfg.allowed_origins.clone();

    let bind_address = format!("0.0.0.0:{}", cfg.port);
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "authorization",
                "content-type",
                "accept",
                "x-requested-with"
            ])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(auth.clone())
            .configure(handlers::routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
