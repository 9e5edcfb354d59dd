//! PostgreSQL store: one `sqlx` transaction per engine operation.

use async_trait::async_trait;
use relman_core::Result;
use relman_core::store::{Store, StoreTx};
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// An open transaction. Dropping it without committing rolls back.
pub struct PgTx {
    pub(crate) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }
}
