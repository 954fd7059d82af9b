use async_trait::async_trait;

use crate::app::error::ProviderError;
use crate::app::models::{ColumnInfo, ForeignKeyInfo, IndexInfo, ScanResult};

/// Catalog introspection and row scanning over a live connection.
///
/// The dumper only reads through a provider; opening and closing the
/// underlying connection stays with whoever constructed it.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn table_names(&self) -> Result<Vec<String>, ProviderError>;

    async fn view_names(&self) -> Result<Vec<String>, ProviderError>;

    /// Columns in the object's natural order.
    async fn columns_of(&self, object: &str) -> Result<Vec<ColumnInfo>, ProviderError>;

    /// Primary-key columns in key order. Empty when there is no primary key.
    async fn primary_keys_of(&self, table: &str) -> Result<Vec<String>, ProviderError>;

    async fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, ProviderError>;

    async fn indexes_of(&self, table: &str) -> Result<Vec<IndexInfo>, ProviderError>;

    /// `SELECT *` over a table or view.
    async fn scan(&self, object: &str) -> Result<ScanResult, ProviderError>;
}
