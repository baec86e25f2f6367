//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must run
//! inside a caller-managed transaction take
//! `&mut sqlx::Transaction<'_, sqlx::Postgres>` instead.

pub mod annotation_repo;
pub mod instance_repo;
pub mod lemma_repo;
pub mod project_repo;
pub mod sequence_repo;
pub mod tutorial_repo;
pub mod use_repo;
pub mod user_repo;

pub use annotation_repo::AnnotationRepo;
pub use instance_repo::InstanceRepo;
pub use lemma_repo::LemmaRepo;
pub use project_repo::ProjectRepo;
pub use sequence_repo::SequenceRepo;
pub use tutorial_repo::TutorialRepo;
pub use use_repo::UseRepo;
pub use user_repo::UserRepo;
