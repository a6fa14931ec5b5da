// src/handlers/file_handlers.rs
use actix_web::{get, web, HttpResponse, Responder};
use log::{error, info};

use crate::AppState;

/// GET /api/files/{file_id}
/// Serve a file referenced by a post (public)
#[get("/files/{file_id}")]
pub async fn serve_file(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let file_id = path.into_inner();

    match state.posts.open_file(&file_id).await {
        Ok(file) => {
            info!("Serving file {} ({} bytes)", file.id, file.bytes.len());
            HttpResponse::Ok().content_type(file.content_type).body(file.bytes)
        }
        Err(e) => {
            error!("Failed to open file {}: {}", file_id, e);
            HttpResponse::build(e.status_code()).json(serde_json::json!({
                "status": "error",
                "message": "File not found"
            }))
        }
    }
}
