//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod demo_access_log_repo;
pub mod demo_project_repo;
pub mod project_access_repo;
pub mod project_repo;
pub mod user_repo;

pub use demo_access_log_repo::DemoAccessLogRepo;
pub use demo_project_repo::DemoProjectRepo;
pub use project_access_repo::ProjectAccessRepo;
pub use project_repo::ProjectRepo;
pub use user_repo::UserRepo;
