// src/repositories/file_repository.rs - uploaded files on local disk
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;
use mime::Mime;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::dtos::post_dtos::UploadedFile;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("mime type not allowed: {0}")]
    MimeNotAllowed(String),
    #[error("empty file")]
    EmptyFile,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadedFile,
    pub path: PathBuf,
    pub mime_types: Vec<Mime>,
}

#[derive(Debug)]
pub struct StoredFile {
    pub id: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Validates and persists the file. Returns the stored identifiers, first one is the file itself.
    async fn upload(&self, req: UploadRequest) -> Result<Vec<String>, UploadError>;

    async fn remove(&self, id: &str) -> Result<(), UploadError>;

    async fn open(&self, id: &str) -> Result<StoredFile, UploadError>;
}

pub fn is_allowed(content_type: &Mime, allowed: &[Mime]) -> bool {
    allowed.iter().any(|m| m.essence_str() == content_type.essence_str())
}

fn extension_for(content_type: &Mime) -> String {
    match content_type.essence_str() {
        "image/jpeg" | "image/jpg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/gif" => "gif".to_string(),
        "image/webp" => "webp".to_string(),
        _ => {
            let sub = content_type.subtype().as_str();
            if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                sub.to_ascii_lowercase()
            } else {
                "bin".to_string()
            }
        }
    }
}

pub fn content_type_for(id: &str) -> &'static str {
    match Path::new(id).extension().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Reduces an identifier to a bare file name; anything with path components is rejected.
fn sanitize_id(id: &str) -> Option<&str> {
    Path::new(id)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| *name == id)
}

#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, id: &str) -> Result<PathBuf, UploadError> {
        let name = sanitize_id(id).ok_or(UploadError::NotFound)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn upload(&self, req: UploadRequest) -> Result<Vec<String>, UploadError> {
        let content_type = req
            .file
            .content_type
            .as_ref()
            .ok_or_else(|| UploadError::MimeNotAllowed("missing content type".to_string()))?;

        if !is_allowed(content_type, &req.mime_types) {
            return Err(UploadError::MimeNotAllowed(content_type.essence_str().to_string()));
        }
        if req.file.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        fs::create_dir_all(&req.path).await?;

        let id = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        fs::write(req.path.join(&id), &req.file.bytes).await?;

        info!(
            "stored upload {:?} ({} bytes) as {}",
            req.file.file_name,
            req.file.bytes.len(),
            id
        );
        Ok(vec![id])
    }

    async fn remove(&self, id: &str) -> Result<(), UploadError> {
        let path = self.locate(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, id: &str) -> Result<StoredFile, UploadError> {
        let path = self.locate(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(StoredFile {
                id: id.to_string(),
                content_type: content_type_for(id),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
