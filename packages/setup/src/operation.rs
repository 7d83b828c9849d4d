//! Persisted progress log of a setup run.

use ram_database::Db;
use ram_database::operations::{finish_operation, log_operation};
use ram_database_models::OperationStatus;

use crate::SetupError;

/// Appends progress entries to one operation's log.
#[derive(Debug, Clone)]
pub struct OperationLogger {
    db: Db,
    operation_id: i64,
}

impl OperationLogger {
    #[must_use]
    pub const fn new(db: Db, operation_id: i64) -> Self {
        Self { db, operation_id }
    }

    #[must_use]
    pub const fn operation_id(&self) -> i64 {
        self.operation_id
    }

    /// Appends an entry with code `code` and data `{"message": message}`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Db`] if the entry cannot be written.
    pub async fn log(&self, code: &str, message: &str) -> Result<(), SetupError> {
        let operation_id = self.operation_id;
        let code = code.to_string();
        let data = serde_json::json!({ "message": message }).to_string();

        self.db
            .run(move |conn| log_operation(conn, operation_id, &code, Some(&data)))
            .await?;
        Ok(())
    }

    /// Closes the operation with its final `status`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Db`] if the update fails.
    pub async fn finish(&self, status: OperationStatus) -> Result<(), SetupError> {
        let operation_id = self.operation_id;
        self.db
            .run(move |conn| finish_operation(conn, operation_id, status))
            .await?;
        Ok(())
    }
}
