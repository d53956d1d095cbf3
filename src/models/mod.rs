// Core data models for hubtrack
// These structs represent the tracked entities and their supporting records

pub mod entity;
pub mod project;
pub mod opportunity;
pub mod event;
pub mod user;

pub use entity::*;
pub use project::*;
pub use opportunity::*;
pub use event::*;
pub use user::*;
