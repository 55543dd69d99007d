use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted value no longer parses (e.g. a decimal column was edited
    /// by hand). Surfaced instead of silently trading on garbage.
    #[error("corrupt row: {context}: {value}")]
    Corrupt { context: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn corrupt(context: &'static str, value: impl Into<String>) -> Self {
        StoreError::Corrupt {
            context,
            value: value.into(),
        }
    }
}
