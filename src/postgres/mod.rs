pub mod errors;
pub mod stores;

pub use errors::PostgresError;
pub use stores::{create_pool, PostgresConfig, PostgresStores};
