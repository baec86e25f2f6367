pub mod annotation;
pub mod instance;
pub mod lemma;
pub mod project;
pub mod sequence;
pub mod tutorial;
pub mod user;
pub mod uses;
