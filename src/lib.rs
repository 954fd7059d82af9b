pub mod app;

#[cfg(test)]
pub(crate) mod testutils;

// Re-export useful types for library users
pub use app::config::AppConfig;
pub use app::dumper::{DumpOptions, Dumper};
pub use app::error::{DumpError, ProviderError, WriteError};
pub use app::formatter::SqlGenerator;
pub use app::generate_dump;
pub use app::inspector::Inspector;
pub use app::models::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, Row, ScanResult, SortOrder, TypeCode, Value,
};
pub use app::provider::MetadataProvider;
