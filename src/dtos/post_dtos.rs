use actix_web::web::Bytes;
use mime::Mime;
use serde::Deserialize;

/// Query string of `GET /api/posts`. Bounds are applied by the post store.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A single file part taken out of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<Mime>,
    pub bytes: Bytes,
}

/// Fields of a create/update form (`multipart/form-data`).
///
/// `file` is the uploaded part named `file`; `file_ref` is a plain text field
/// with the same name, used by clients to keep the file a post already has.
#[derive(Debug, Default, Clone)]
pub struct PostForm {
    pub heading: Option<String>,
    pub text: Option<String>,
    pub file: Option<UploadedFile>,
    pub file_ref: Option<String>,
}

/// JSON or urlencoded update body; carries no upload.
#[derive(Debug, Default, Deserialize)]
pub struct PostBody {
    pub heading: Option<String>,
    pub text: Option<String>,
    /// Reference to a file the post already has
    pub file: Option<String>,
}

impl From<PostBody> for PostForm {
    fn from(body: PostBody) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        PostForm {
            heading: present(body.heading),
            text: present(body.text),
            file: None,
            file_ref: present(body.file),
        }
    }
}

impl PostForm {
    pub fn is_empty(&self) -> bool {
        self.heading.is_none() && self.text.is_none() && self.file.is_none() && self.file_ref.is_none()
    }
}
