use thiserror::Error;

/// Failures of the PostgreSQL-backed baseline, history and registry stores
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("Store query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Store connection unavailable: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Store pool setup failed: {0}")]
    Setup(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::StoreError;

    #[test]
    fn test_setup_error_surfaces_through_store_error() {
        let err = StoreError::from(PostgresError::Setup("Connection test failed".to_string()));
        assert_eq!(err.to_string(), "Database error: Store pool setup failed: Connection test failed");
    }

    #[test]
    fn test_pool_timeout_message() {
        let err = PostgresError::from(deadpool_postgres::PoolError::Timeout(deadpool::managed::TimeoutType::Wait));
        assert!(err.to_string().starts_with("Store connection unavailable:"));
    }
}
