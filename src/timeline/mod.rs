// Stage resolution and progress derivation
// Pure functions over a catalog and a stored stage id

pub mod resolver;
pub mod progress;

pub use resolver::*;
pub use progress::*;
