use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("http request failed: {0}")]
    Http(#[from] wreq::Error),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
