use std::fmt;

use sqlx::FromRow;

use crate::app::error::ProviderError;

/// Storage class of a column, independent of the dialect's type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCode {
    Char,
    VarChar,
    LongVarChar,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Decimal,
    Real,
    Double,
    Boolean,
    Date,
    Time,
    Timestamp,
    Null,
    /// Anything without a literal rule; carries the provider's type name.
    Other(String),
}

impl TypeCode {
    /// Classifies a provider type name. Accepts both the SQL standard
    /// spellings and PostgreSQL's internal names (`int4`, `bpchar`, ...).
    pub fn from_type_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        // Drop any length/precision modifier: "character varying(20)".
        let base = match lowered.find('(') {
            Some(pos) => lowered[..pos].trim_end(),
            None => lowered.as_str(),
        };

        match base {
            "char" | "character" | "bpchar" | "nchar" => TypeCode::Char,
            "varchar" | "character varying" | "nvarchar" | "name" => TypeCode::VarChar,
            "text" | "longvarchar" | "clob" => TypeCode::LongVarChar,
            "smallint" | "int2" => TypeCode::SmallInt,
            "integer" | "int" | "int4" => TypeCode::Integer,
            "bigint" | "int8" => TypeCode::BigInt,
            "numeric" => TypeCode::Numeric,
            "decimal" => TypeCode::Decimal,
            "real" | "float4" | "float" => TypeCode::Real,
            "double precision" | "double" | "float8" => TypeCode::Double,
            "boolean" | "bool" => TypeCode::Boolean,
            "date" => TypeCode::Date,
            "time" | "timetz" | "time without time zone" | "time with time zone" => TypeCode::Time,
            "timestamp"
            | "timestamptz"
            | "timestamp without time zone"
            | "timestamp with time zone" => TypeCode::Timestamp,
            "null" => TypeCode::Null,
            _ => TypeCode::Other(name.to_string()),
        }
    }

    /// Whether a scan has to read this column through its text form.
    pub fn reads_as_text(&self) -> bool {
        matches!(
            self,
            TypeCode::Char
                | TypeCode::VarChar
                | TypeCode::LongVarChar
                | TypeCode::Numeric
                | TypeCode::Decimal
                | TypeCode::Date
                | TypeCode::Time
                | TypeCode::Timestamp
                | TypeCode::Other(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub column_name: String,
    pub type_name: String,
    pub type_code: TypeCode,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(column_name: &str, type_name: &str, nullable: bool) -> Self {
        Self {
            column_name: column_name.to_string(),
            type_name: type_name.to_string(),
            type_code: TypeCode::from_type_name(type_name),
            nullable,
        }
    }
}

/// One imported-key row. Composite keys arrive as several rows sharing
/// `constraint_name`.
#[derive(FromRow, Debug, Clone, PartialEq)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column_name: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
}

/// One indexed column; multi-column indexes arrive as consecutive rows.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub index_name: String,
    pub table_name: String,
    pub column_name: String,
    pub unique: bool,
    /// `"A"`, `"D"` or absent when the index has no defined order.
    pub sort_order_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(SortOrder::Ascending),
            "D" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A scanned row. Accessors are positional and follow the column order of
/// the scan that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of cells in the row.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> Result<&Value, ProviderError> {
        self.values
            .get(index)
            .ok_or(ProviderError::ColumnOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    pub fn is_null(&self, index: usize) -> Result<bool, ProviderError> {
        Ok(matches!(self.get(index)?, Value::Null))
    }

    pub fn text(&self, index: usize) -> Result<&str, ProviderError> {
        match self.get(index)? {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(index, "text", other)),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, ProviderError> {
        match self.get(index)? {
            Value::Integer(i) => Ok(*i),
            other => Err(mismatch(index, "integer", other)),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64, ProviderError> {
        match self.get(index)? {
            Value::Float(f) => Ok(*f),
            // Integral values widen without loss of meaning.
            Value::Integer(i) => Ok(*i as f64),
            other => Err(mismatch(index, "float", other)),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool, ProviderError> {
        match self.get(index)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(mismatch(index, "boolean", other)),
        }
    }
}

fn mismatch(index: usize, expected: &'static str, found: &Value) -> ProviderError {
    ProviderError::TypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

/// Output of a full scan: the column descriptors, read once, and every row.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}
