/// Failure inside a metadata provider: a query, a decode, or a row accessor.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Internal SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Column {index} holds a {found} value, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column {index} is out of range for a row of {len} values")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("Row {row} has {found} values for {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Failed reading metadata for {object:?}: {source}")]
    Metadata {
        object: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed scanning {object:?}: {source}")]
    Scan {
        object: String,
        #[source]
        source: ProviderError,
    },

    #[error("Column {column:?} of {object:?} has type {type_name:?} with no literal form")]
    UnsupportedType {
        object: String,
        column: String,
        type_name: String,
    },

    #[error("Index {index:?} reports unknown sort order {code:?}")]
    UnknownSortOrder { index: String, code: String },

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

impl DumpError {
    pub(crate) fn metadata(object: &str) -> impl FnOnce(ProviderError) -> Self + '_ {
        move |source| DumpError::Metadata {
            object: object.to_string(),
            source,
        }
    }

    pub(crate) fn scan(object: &str) -> impl FnOnce(ProviderError) -> Self + '_ {
        move |source| DumpError::Scan {
            object: object.to_string(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Failed generating dump: {0}")]
    Generate(#[from] DumpError),

    #[error("Failed writing dump to {destination}: {source}")]
    Io {
        destination: String,
        #[source]
        source: std::io::Error,
    },
}
