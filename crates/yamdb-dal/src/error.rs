pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Confirmation code hash error: {0}")]
    CodeHashError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record with this {field} already exists")]
    Duplicate { field: String },

    #[error("Unknown {field} reference: {value}")]
    InvalidReference { field: &'static str, value: String },

    #[error("Author already reviewed this title")]
    DuplicateReview,

    #[error("Invalid confirmation code")]
    InvalidCredentials,
}

impl Error {
    /// Turns unique constraint violation into [`Error::Duplicate`], naming the offending column.
    pub(crate) fn from_unique_violation(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &e {
            if db_error.is_unique_violation() {
                let field = unique_violation_field(db_error.message()).unwrap_or("record");
                return Error::Duplicate {
                    field: field.to_string(),
                };
            }
        }
        Error::DatabaseError(e)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RecordNotFound(_) | Error::DatabaseError(sqlx::Error::RowNotFound)
        )
    }
}

// SQLite reports as "UNIQUE constraint failed: table.column[, table.column]"
fn unique_violation_field(message: &str) -> Option<&str> {
    let columns = message.split_once("failed:")?.1;
    let first = columns.split(',').next()?.trim();
    first.rsplit_once('.').map(|(_, column)| column)
}
