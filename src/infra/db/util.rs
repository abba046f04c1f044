use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
            RepoError::Duplicate {
                constraint: db
                    .message()
                    .trim_start_matches("UNIQUE constraint failed:")
                    .trim()
                    .to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("FOREIGN KEY constraint failed")
                || db.message().contains("NOT NULL constraint failed") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("database is locked") => {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}
