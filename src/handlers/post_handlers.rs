// src/handlers/post_handlers.rs - /api/posts resource
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::web::BytesMut;
use actix_web::{delete, get, post, put, web, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::{error, info};
use thiserror::Error;
use uuid::Uuid;

use crate::dtos::post_dtos::{ListQuery, PostBody, PostForm, UploadedFile};
use crate::middleware::auth_extractor::{AdminUser, ReaderUser};
use crate::AppState;

const CREATE_ERROR: &str = "Posts create error: data not available";
const PUT_ERROR: &str = "Posts put error: ";
const PUT_NO_DATA: &str = "Posts put error: data not found";
const PUT_UPLOAD_PROBLEM: &str = "Posts put error: file upload problem";
const REMOVE_ERROR: &str = "Posts remove error: ";

const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Error)]
pub enum FormError {
    #[error("multipart error: {0}")]
    Multipart(String),
    #[error("body error: {0}")]
    Body(String),
    #[error("unsupported content type: {0}")]
    Unsupported(String),
    #[error("file too large")]
    TooLarge,
}

impl FormError {
    fn status_code(&self) -> StatusCode {
        match self {
            FormError::Multipart(_) | FormError::Body(_) => StatusCode::BAD_REQUEST,
            FormError::Unsupported(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            FormError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

fn plain_text(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(message.into())
}

fn non_empty(buf: &[u8]) -> Result<Option<String>, FormError> {
    let value = std::str::from_utf8(buf)
        .map_err(|e| FormError::Multipart(format!("field is not valid utf-8: {}", e)))?;
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Reads a create/update body. Multipart carries the upload; JSON and
/// urlencoded bodies only carry `heading`, `text` and the `file` reference.
/// A request without a content type yields an empty form.
async fn read_post_form(req: &HttpRequest, payload: web::Payload) -> Result<PostForm, FormError> {
    match req.content_type() {
        "" => Ok(PostForm::default()),
        "multipart/form-data" => read_multipart(Multipart::new(req.headers(), payload)).await,
        "application/json" => web::Json::<PostBody>::from_request(req, &mut payload.into_inner())
            .await
            .map(|body| PostForm::from(body.into_inner()))
            .map_err(|e| FormError::Body(e.to_string())),
        "application/x-www-form-urlencoded" => {
            web::Form::<PostBody>::from_request(req, &mut payload.into_inner())
                .await
                .map(|body| PostForm::from(body.into_inner()))
                .map_err(|e| FormError::Body(e.to_string()))
        }
        other => Err(FormError::Unsupported(other.to_string())),
    }
}

async fn read_multipart(mut payload: Multipart) -> Result<PostForm, FormError> {
    let mut form = PostForm::default();

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| FormError::Multipart(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().cloned();

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| FormError::Multipart(e.to_string()))?;
            if buf.len() + chunk.len() > MAX_FILE_SIZE {
                return Err(FormError::TooLarge);
            }
            buf.extend_from_slice(&chunk);
        }

        match (name.as_str(), file_name) {
            // browsers send an empty filename when nothing was picked
            ("file", Some(file_name)) if file_name.is_empty() && buf.is_empty() => {}
            ("file", Some(file_name)) => {
                form.file = Some(UploadedFile {
                    file_name: Some(file_name),
                    content_type,
                    bytes: buf.freeze(),
                })
            }
            ("file", None) => form.file_ref = non_empty(&buf)?,
            ("heading", _) => form.heading = non_empty(&buf)?,
            ("text", _) => form.text = non_empty(&buf)?,
            _ => {}
        }
    }

    Ok(form)
}

/// GET /api/posts/{id}
#[get("/posts/{id}")]
pub async fn get_post(
    state: web::Data<AppState>,
    _user: ReaderUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match state.posts.get_one(id).await {
        Ok(post) => {
            info!("Post fetched: {:?}", post);
            HttpResponse::Ok().json(post)
        }
        Err(e) => {
            error!("Failed to fetch post {}: {}", id, e);
            HttpResponse::build(e.status_code()).finish()
        }
    }
}

/// GET /api/posts?page&limit
/// Public, newest first
#[get("/posts")]
pub async fn list_posts(state: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    let ListQuery { page, limit } = query.into_inner();
    match state.posts.get_order_list(page, limit).await {
        Ok(posts) if posts.is_empty() => {
            error!("No posts for page {:?} limit {:?}: {:?}", page, limit, posts);
            HttpResponse::NotFound().finish()
        }
        Ok(posts) => {
            info!("Posts listed ({} items): {:?}", posts.len(), posts);
            HttpResponse::Ok().json(posts)
        }
        Err(e) => {
            error!("Failed to list posts: {}", e);
            HttpResponse::build(e.status_code()).finish()
        }
    }
}

/// POST /api/posts
/// Multipart form: heading, text, file (required)
#[post("/posts")]
pub async fn create_post(
    state: web::Data<AppState>,
    _admin: AdminUser,
    req: HttpRequest,
    payload: web::Payload,
) -> HttpResponse {
    let form = match read_post_form(&req, payload).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to read post form: {}", e);
            return plain_text(e.status_code(), CREATE_ERROR);
        }
    };

    match state.posts.create(form).await {
        Ok(post) => {
            info!("Post created: {:?}", post);
            HttpResponse::Ok().json(post)
        }
        Err(e) => {
            error!("Failed to create post: {}", e);
            plain_text(e.status_code(), CREATE_ERROR)
        }
    }
}

/// PUT /api/posts/{id}
/// Multipart, JSON or urlencoded body, every field optional. A text field
/// named `file` keeps an existing file reference; a multipart file part named
/// `file` replaces it.
#[put("/posts/{id}")]
pub async fn update_post(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> HttpResponse {
    let id = path.into_inner();
    let form = match read_post_form(&req, payload).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to read update form for post {}: {}", id, e);
            return plain_text(e.status_code(), format!("{}{}", PUT_ERROR, e));
        }
    };

    if form.is_empty() {
        error!("{}", PUT_NO_DATA);
        return plain_text(StatusCode::BAD_REQUEST, PUT_NO_DATA);
    }

    match state.posts.update(id, form).await {
        Ok(post) => {
            info!("Post updated: {:?}", post);
            HttpResponse::Ok().json(post)
        }
        Err(e) if e.is_upload_failure() => {
            error!("File upload for post {} failed: {}", id, e);
            plain_text(e.status_code(), PUT_UPLOAD_PROBLEM)
        }
        Err(e) => {
            error!("Failed to update post {}: {}", id, e);
            plain_text(e.status_code(), format!("{}{}", PUT_ERROR, e))
        }
    }
}

/// DELETE /api/posts/{id}
/// Responds with the deleted post
#[delete("/posts/{id}")]
pub async fn delete_post(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match state.posts.remove(id).await {
        Ok(removed) => {
            info!("Post removed: {:?}", removed);
            HttpResponse::Ok().json(removed)
        }
        Err(e) => {
            error!("Failed to remove post {}: {}", id, e);
            plain_text(e.status_code(), format!("{}{}", REMOVE_ERROR, e))
        }
    }
}
