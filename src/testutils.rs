use std::collections::HashSet;

use async_trait::async_trait;

use crate::app::error::ProviderError;
use crate::app::models::{ColumnInfo, ForeignKeyInfo, IndexInfo, Row, ScanResult, Value};
use crate::app::provider::MetadataProvider;

/// A table or view held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryObject {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
    pub rows: Vec<Row>,
}

impl MemoryObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_keys.push(column.to_string());
        self
    }

    pub fn foreign_key(
        mut self,
        constraint: &str,
        column: &str,
        table: &str,
        referenced: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyInfo {
            constraint_name: constraint.to_string(),
            column_name: column.to_string(),
            foreign_table_name: table.to_string(),
            foreign_column_name: referenced.to_string(),
        });
        self
    }

    pub fn index(mut self, name: &str, column: &str, unique: bool, order: Option<&str>) -> Self {
        self.indexes.push(IndexInfo {
            index_name: name.to_string(),
            table_name: self.name.clone(),
            column_name: column.to_string(),
            unique,
            sort_order_code: order.map(str::to_string),
        });
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(Row::new(values));
        self
    }
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    tables: Vec<MemoryObject>,
    views: Vec<MemoryObject>,
    failing_scans: HashSet<String>,
    failing_metadata: HashSet<String>,
}

impl MemoryProvider {
    pub fn with_table(mut self, table: MemoryObject) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_view(mut self, view: MemoryObject) -> Self {
        self.views.push(view);
        self
    }

    pub fn failing_scan(mut self, object: &str) -> Self {
        self.failing_scans.insert(object.to_string());
        self
    }

    pub fn failing_metadata(mut self, object: &str) -> Self {
        self.failing_metadata.insert(object.to_string());
        self
    }

    fn object(&self, name: &str) -> Result<&MemoryObject, ProviderError> {
        if self.failing_metadata.contains(name) {
            return Err(ProviderError::Other(format!("metadata for {name} unavailable")));
        }
        self.tables
            .iter()
            .chain(self.views.iter())
            .find(|object| object.name == name)
            .ok_or_else(|| ProviderError::Other(format!("relation {name} does not exist")))
    }
}

#[async_trait]
impl MetadataProvider for MemoryProvider {
    async fn table_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn view_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.views.iter().map(|v| v.name.clone()).collect())
    }

    async fn columns_of(&self, object: &str) -> Result<Vec<ColumnInfo>, ProviderError> {
        Ok(self.object(object)?.columns.clone())
    }

    async fn primary_keys_of(&self, table: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.object(table)?.primary_keys.clone())
    }

    async fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, ProviderError> {
        Ok(self.object(table)?.foreign_keys.clone())
    }

    async fn indexes_of(&self, table: &str) -> Result<Vec<IndexInfo>, ProviderError> {
        Ok(self.object(table)?.indexes.clone())
    }

    async fn scan(&self, object: &str) -> Result<ScanResult, ProviderError> {
        if self.failing_scans.contains(object) {
            return Err(ProviderError::Other(format!("permission denied for {object}")));
        }
        let found = self.object(object)?;
        Ok(ScanResult {
            columns: found.columns.clone(),
            rows: found.rows.clone(),
        })
    }
}
