use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::error::GabineteError;

/// Applies a field-level update to the database.
///
/// Takes a connection rather than a pool so callers can run it inside a transaction.
#[async_trait]
pub trait DbPatchable {
    async fn apply_patch(&self, conn: &mut SqliteConnection) -> Result<(), GabineteError>;
}
