pub mod store;
pub mod repository;
pub mod stage;
pub mod opportunity;

pub use store::*;
pub use repository::*;
pub use stage::*;
