pub mod file_handlers;
pub mod post_handlers;

use actix_web::web;

use file_handlers::serve_file;
use post_handlers::{create_post, delete_post, get_post, list_posts, update_post};

/// Registers every route under `/api`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(list_posts)   // GET /api/posts
            .service(create_post)  // POST /api/posts
            .service(get_post)     // GET /api/posts/{id}
            .service(update_post)  // PUT /api/posts/{id}
            .service(delete_post)  // DELETE /api/posts/{id}
            .service(serve_file),  // GET /api/files/{file_id}
    );
}
