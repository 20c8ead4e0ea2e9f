pub mod config;
pub mod database;
pub mod repository;
pub mod store;

pub use config::DatabaseConfig;
pub use database::Database;
pub use repository::ProjectRepository;
pub use store::AnyStore;
