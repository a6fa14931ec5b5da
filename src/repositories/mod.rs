pub mod file_repository;
pub mod post_repository;
