pub mod config;
pub mod connection;
pub mod migrations;

pub use config::Config;
pub use connection::DbConnection;
pub use migrations::MigrationManager;
