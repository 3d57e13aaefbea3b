use async_trait::async_trait;
use pramaan_core::{BackendError, Comparison, ComparisonBackend, FieldRecord};

use crate::db::{self, DbPool};

/// Local table lookup: a digest is valid when the registry holds it.
#[derive(Clone)]
pub struct LocalRegistry {
    pool: DbPool,
}

impl LocalRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ComparisonBackend for LocalRegistry {
    fn name(&self) -> &'static str {
        "local-registry"
    }

    async fn compare(&self, digest: &str, _record: &FieldRecord) -> Result<Comparison, BackendError> {
        let row = db::find_by_digest(&self.pool, digest)
            .await
            .map_err(|e| BackendError::Registry(e.to_string()))?;

        Ok(match row {
            Some(issued) => {
                tracing::debug!("Registry hit for {digest}");
                Comparison::found(issued.issuer, Some(issued.issued_at))
            }
            None => Comparison::not_found(),
        })
    }
}
