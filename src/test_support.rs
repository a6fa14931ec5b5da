// src/test_support.rs - in-memory stores and request helpers for tests
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::web::{self, Bytes};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use crate::dtos::post_dtos::UploadedFile;
use crate::middleware::auth_extractor::{AuthSettings, Claims, Role};
use crate::models::post::{NewPost, Post, PostChanges};
use crate::repositories::file_repository::{
    content_type_for, is_allowed, FileStore, StoredFile, UploadError, UploadRequest,
};
use crate::repositories::post_repository::{page_window, PostStore, RepoError};
use crate::services::post_service::{PostService, UploadSettings};
use crate::AppState;

pub const JWT_SECRET: &str = "test-secret";
pub const BOUNDARY: &str = "posts-api-test-boundary";

/// Ordered record of collaborator calls, shared between fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct MemoryPostStore {
    posts: Mutex<Vec<Post>>,
    calls: CallLog,
    failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    ack_delay: Mutex<Option<Duration>>,
}

impl MemoryPostStore {
    pub fn new(calls: CallLog) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            calls,
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            ack_delay: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay(&self, by: Duration) {
        *self.delay.lock().unwrap() = Some(by);
    }

    /// Writes still apply immediately, only the reply is late.
    pub fn delay_ack(&self, by: Duration) {
        *self.ack_delay.lock().unwrap() = Some(by);
    }

    pub fn all(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    async fn acknowledge(&self) {
        let delay = *self.ack_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn insert(&self, heading: &str, text: &str, file: Option<&str>) -> Post {
        let mut posts = self.posts.lock().unwrap();
        let post = Post {
            id: Uuid::new_v4(),
            heading: Some(heading.to_string()),
            text: Some(text.to_string()),
            file: file.map(str::to_string),
            // spaced out so the newest-first order is deterministic
            created_at: Utc::now() + chrono::Duration::seconds(posts.len() as i64),
            updated_at: None,
        };
        posts.push(post.clone());
        post
    }

    pub fn get(&self, id: Uuid) -> Option<Post> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    async fn enter(&self, call: &str) -> Result<(), RepoError> {
        self.calls.push(call);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(RepoError::Other(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn get_one(&self, id: Uuid) -> Result<Post, RepoError> {
        self.enter("posts.get_one").await?;
        self.get(id).ok_or(RepoError::NotFound)
    }

    async fn get_order_list(&self, page: Option<u32>, limit: Option<u32>) -> Result<Vec<Post>, RepoError> {
        self.enter("posts.list").await?;
        let (limit, offset) = page_window(page, limit);
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        self.enter("posts.create").await?;
        let created = Post {
            id: Uuid::new_v4(),
            heading: post.heading,
            text: post.text,
            file: post.file,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.posts.lock().unwrap().push(created.clone());
        self.acknowledge().await;
        Ok(created)
    }

    async fn update(&self, changes: PostChanges) -> Result<Post, RepoError> {
        self.enter("posts.update").await?;
        let updated = {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .iter_mut()
                .find(|p| p.id == changes.id)
                .ok_or(RepoError::NotFound)?;
            if let Some(heading) = changes.heading {
                post.heading = Some(heading);
            }
            if let Some(text) = changes.text {
                post.text = Some(text);
            }
            if let Some(file) = changes.file {
                post.file = Some(file);
            }
            post.updated_at = Some(Utc::now());
            post.clone()
        };
        self.acknowledge().await;
        Ok(updated)
    }

    async fn remove(&self, id: Uuid) -> Result<Post, RepoError> {
        self.enter("posts.remove").await?;
        let mut posts = self.posts.lock().unwrap();
        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(posts.remove(index))
    }
}

pub struct MemoryFileStore {
    files: Mutex<Vec<(String, Vec<u8>)>>,
    calls: CallLog,
    counter: AtomicUsize,
    reject: Mutex<bool>,
}

impl MemoryFileStore {
    pub fn new(calls: CallLog) -> Self {
        Self {
            files: Mutex::new(Vec::new()),
            calls,
            counter: AtomicUsize::new(0),
            reject: Mutex::new(false),
        }
    }

    pub fn reject_uploads(&self) {
        *self.reject.lock().unwrap() = true;
    }

    pub fn put(&self, id: &str, bytes: &[u8]) {
        self.files.lock().unwrap().push((id.to_string(), bytes.to_vec()));
    }

    pub fn stored(&self) -> Vec<String> {
        self.files.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn upload(&self, req: UploadRequest) -> Result<Vec<String>, UploadError> {
        self.calls.push("files.upload");
        let content_type = req
            .file
            .content_type
            .ok_or_else(|| UploadError::MimeNotAllowed("missing content type".to_string()))?;
        if *self.reject.lock().unwrap() || !is_allowed(&content_type, &req.mime_types) {
            return Err(UploadError::MimeNotAllowed(content_type.essence_str().to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("file-{}.{}", n, content_type.subtype());
        self.put(&id, &req.file.bytes);
        Ok(vec![id])
    }

    async fn remove(&self, id: &str) -> Result<(), UploadError> {
        self.calls.push(format!("files.remove:{}", id));
        let mut files = self.files.lock().unwrap();
        let index = files
            .iter()
            .position(|(stored, _)| stored == id)
            .ok_or(UploadError::NotFound)?;
        files.remove(index);
        Ok(())
    }

    async fn open(&self, id: &str) -> Result<StoredFile, UploadError> {
        self.calls.push("files.open");
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(stored, bytes)| StoredFile {
                id: stored.clone(),
                content_type: content_type_for(stored),
                bytes: bytes.clone(),
            })
            .ok_or(UploadError::NotFound)
    }
}

pub fn png_upload() -> UploadedFile {
    UploadedFile {
        file_name: Some("photo.png".to_string()),
        content_type: Some(mime::IMAGE_PNG),
        bytes: Bytes::from_static(b"\x89PNG\r\n"),
    }
}

/// Fakes wired into application state, plus handles to inspect them.
pub struct Harness {
    pub calls: CallLog,
    pub store: Arc<MemoryPostStore>,
    pub files: Arc<MemoryFileStore>,
    pub state: web::Data<AppState>,
    pub auth: web::Data<AuthSettings>,
}

impl Harness {
    pub fn new() -> Self {
        let calls = CallLog::default();
        let store = Arc::new(MemoryPostStore::new(calls.clone()));
        let files = Arc::new(MemoryFileStore::new(calls.clone()));
        let posts = PostService::new(
            store.clone(),
            files.clone(),
            UploadSettings {
                path: "uploads/test".into(),
                mime_types: vec![mime::IMAGE_PNG, mime::IMAGE_JPEG],
            },
            Duration::from_secs(5),
        );
        Self {
            calls,
            store,
            files,
            state: web::Data::new(AppState { posts }),
            auth: web::Data::new(AuthSettings::new(JWT_SECRET)),
        }
    }
}

pub fn token(role: Role) -> String {
    let claims = Claims {
        sub: "user-1".to_string(),
        role: role as u8,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(role: Role) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(role)))
}

/// Builds a `multipart/form-data` body. Returns the content type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
