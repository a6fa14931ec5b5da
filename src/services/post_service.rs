// src/services/post_service.rs - upload/store sequencing for the posts resource
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use log::{error, warn};
use mime::Mime;
use thiserror::Error;
use tokio::time::timeout;
use uuid::Uuid;

use crate::dtos::post_dtos::{PostForm, UploadedFile};
use crate::models::post::{NewPost, Post, PostChanges};
use crate::repositories::file_repository::{FileStore, StoredFile, UploadError, UploadRequest};
use crate::repositories::post_repository::{PostStore, RepoError};

const FILE_UPLOAD: &str = "file upload";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("no file provided")]
    MissingFile,
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    #[error("upload returned no file id")]
    EmptyUpload,
    #[error("{0}")]
    Store(#[from] RepoError),
    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl PostError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PostError::MissingFile | PostError::Upload(UploadError::EmptyFile) => StatusCode::BAD_REQUEST,
            PostError::Upload(UploadError::MimeNotAllowed(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PostError::Upload(UploadError::NotFound) | PostError::Store(RepoError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            PostError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the file step failed, before any post row was touched.
    pub fn is_upload_failure(&self) -> bool {
        matches!(
            self,
            PostError::Upload(_) | PostError::EmptyUpload | PostError::Timeout(FILE_UPLOAD)
        )
    }
}

/// Where uploads for posts go and which content types they may have.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub path: PathBuf,
    pub mime_types: Vec<Mime>,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    files: Arc<dyn FileStore>,
    upload: UploadSettings,
    call_timeout: Duration,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        files: Arc<dyn FileStore>,
        upload: UploadSettings,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            files,
            upload,
            call_timeout,
        }
    }

    async fn guarded<T, E>(
        &self,
        what: &'static str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, PostError>
    where
        PostError: From<E>,
    {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(PostError::from),
            Err(_) => Err(PostError::Timeout(what)),
        }
    }

    pub async fn get_one(&self, id: Uuid) -> Result<Post, PostError> {
        self.guarded("post lookup", self.store.get_one(id)).await
    }

    pub async fn get_order_list(&self, page: Option<u32>, limit: Option<u32>) -> Result<Vec<Post>, PostError> {
        self.guarded("post listing", self.store.get_order_list(page, limit)).await
    }

    /// Uploads the file, then writes a post that references the first stored id.
    /// The upload is discarded again when the store rejects the write.
    pub async fn create(&self, form: PostForm) -> Result<Post, PostError> {
        let file = form.file.ok_or(PostError::MissingFile)?;
        let file_id = self.upload_file(file).await?;

        let new_post = NewPost {
            heading: form.heading,
            text: form.text,
            file: Some(file_id.clone()),
        };

        let result = self.guarded("post create", self.store.create(new_post)).await;
        if let Err(e) = &result {
            self.release_upload(&file_id, e).await;
        }
        result
    }

    /// Applies a partial update. A new file takes precedence over `file_ref`;
    /// when neither is given the stored reference is kept. Upload failures
    /// return before the store is called.
    pub async fn update(&self, id: Uuid, form: PostForm) -> Result<Post, PostError> {
        let uploaded = match form.file {
            Some(file) => Some(self.upload_file(file).await?),
            None => None,
        };

        let changes = PostChanges {
            id,
            heading: form.heading,
            text: form.text,
            file: uploaded.clone().or(form.file_ref),
        };

        let result = self.guarded("post update", self.store.update(changes)).await;
        if let (Err(e), Some(file_id)) = (&result, &uploaded) {
            self.release_upload(file_id, e).await;
        }
        result
    }

    pub async fn remove(&self, id: Uuid) -> Result<Post, PostError> {
        self.guarded("post remove", self.store.remove(id)).await
    }

    pub async fn open_file(&self, id: &str) -> Result<StoredFile, PostError> {
        self.guarded("file read", self.files.open(id)).await
    }

    async fn upload_file(&self, file: UploadedFile) -> Result<String, PostError> {
        let request = UploadRequest {
            file,
            path: self.upload.path.clone(),
            mime_types: self.upload.mime_types.clone(),
        };
        let ids = self.guarded(FILE_UPLOAD, self.files.upload(request)).await?;
        ids.into_iter().next().ok_or(PostError::EmptyUpload)
    }

    /// Only a definite store error proves no row references the upload. After a
    /// timeout the write may still have committed, so the file stays.
    async fn release_upload(&self, file_id: &str, cause: &PostError) {
        match cause {
            PostError::Store(_) => self.discard(file_id).await,
            _ => warn!("post write outcome unknown ({}), keeping upload {} as a possible orphan", cause, file_id),
        }
    }

    async fn discard(&self, file_id: &str) {
        warn!("post write failed, removing orphaned upload {}", file_id);
        if let Err(e) = self.guarded("file remove", self.files.remove(file_id)).await {
            error!("failed to remove orphaned upload {}: {}", file_id, e);
        }
    }
}
