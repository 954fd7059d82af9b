use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row as _};
use tracing::warn;

use crate::app::error::ProviderError;
use crate::app::models::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, Row, ScanResult, TypeCode, Value,
};
use crate::app::provider::MetadataProvider;
use crate::app::quote::double_quotify;

// It handles all database interaction for one schema of a PostgreSQL database.

pub struct Inspector<'a> {
    pool: &'a sqlx::PgPool,
    schema: String,
}

#[derive(FromRow, Debug)]
struct ColumnRow {
    column_name: String,
    type_name: String,
    not_null: bool,
}

#[derive(FromRow, Debug, Clone)]
struct IndexRow {
    index_name: String,
    table_name: String,
    // Null for an expression key.
    column_name: Option<String>,
    is_unique: bool,
    // False for partial and expression indexes.
    is_plain: bool,
    asc_or_desc: Option<String>,
}

impl<'a> Inspector<'a> {
    pub fn new(pool: &'a sqlx::PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
        }
    }

    async fn relation_names(&self, table_type: &str) -> Result<Vec<String>, ProviderError> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = $2
            ORDER BY table_name
            "#,
        )
        .bind(&self.schema)
        .bind(table_type)
        .fetch_all(self.pool)
        .await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    fn qualified(&self, object: &str) -> String {
        format!("{}.{}", double_quotify(&self.schema), double_quotify(object))
    }
}

#[async_trait]
impl MetadataProvider for Inspector<'_> {
    async fn table_names(&self) -> Result<Vec<String>, ProviderError> {
        self.relation_names("BASE TABLE").await
    }

    async fn view_names(&self) -> Result<Vec<String>, ProviderError> {
        self.relation_names("VIEW").await
    }

    async fn columns_of(&self, object: &str) -> Result<Vec<ColumnInfo>, ProviderError> {
        // format_type keeps length and precision modifiers: varchar(20), numeric(10,2).
        let rows = sqlx::query_as::<_, ColumnRow>(
            r#"
            SELECT
                a.attname::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS type_name,
                a.attnotnull AS not_null
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
              AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
            "#,
        )
        .bind(&self.schema)
        .bind(object)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnInfo::new(&row.column_name, &row.type_name, !row.not_null))
            .collect())
    }

    async fn primary_keys_of(&self, table: &str) -> Result<Vec<String>, ProviderError> {
        let result: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
              AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(self.pool)
        .await?;
        Ok(result.into_iter().map(|(name,)| name).collect())
    }

    async fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, ProviderError> {
        // conkey and confkey are parallel arrays; unnesting them together pairs
        // each local column with the referenced column at the same position.
        let rows = sqlx::query_as::<_, ForeignKeyInfo>(
            r#"
            SELECT
                con.conname::text AS constraint_name,
                la.attname::text AS column_name,
                ft.relname::text AS foreign_table_name,
                fa.attname::text AS foreign_column_name
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class ft ON ft.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(local_attnum, foreign_attnum, ord)
            JOIN pg_catalog.pg_attribute la
                ON la.attrelid = con.conrelid AND la.attnum = k.local_attnum
            JOIN pg_catalog.pg_attribute fa
                ON fa.attrelid = con.confrelid AND fa.attnum = k.foreign_attnum
            WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2
            ORDER BY con.conname, k.ord
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn indexes_of(&self, table: &str) -> Result<Vec<IndexInfo>, ProviderError> {
        // Primary-key indexes come back with the table DDL and only btree keys
        // carry a direction.
        let rows = sqlx::query_as::<_, IndexRow>(
            r#"
            SELECT
                i.relname::text AS index_name,
                t.relname::text AS table_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique,
                (ix.indpred IS NULL AND ix.indexprs IS NULL) AS is_plain,
                CASE
                    WHEN am.amname <> 'btree' THEN NULL
                    WHEN (ix.indoption[(k.ord - 1)::int] & 1) = 1 THEN 'D'
                    ELSE 'A'
                END AS asc_or_desc
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_am am ON am.oid = i.relam
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
            LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1 AND t.relname = $2
              AND NOT ix.indisprimary
              AND k.ord <= ix.indnkeyatts
            ORDER BY i.relname, k.ord
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(self.pool)
        .await?;

        Ok(plain_indexes(rows))
    }

    async fn scan(&self, object: &str) -> Result<ScanResult, ProviderError> {
        let columns = self.columns_of(object).await?;
        if columns.is_empty() {
            return Ok(ScanResult::default());
        }

        // Anything without a native decoder is read through its text form.
        let select_list = columns
            .iter()
            .map(|col| {
                let name = double_quotify(&col.column_name);
                if col.type_code.reads_as_text() {
                    format!("{name}::text AS {name}")
                } else {
                    name
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let data_query = format!("SELECT {} FROM {}", select_list, self.qualified(object));

        let pg_rows: Vec<PgRow> = sqlx::query(&data_query).fetch_all(self.pool).await?;
        let rows = pg_rows
            .iter()
            .map(|row| decode_row(row, &columns))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScanResult { columns, rows })
    }
}

// A CREATE INDEX rebuilt from column names alone would drop a partial index's
// predicate or an expression key, so such indexes are left out whole.
fn plain_indexes(rows: Vec<IndexRow>) -> Vec<IndexInfo> {
    let mut indexes = Vec::with_capacity(rows.len());
    for group in rows.chunk_by(|a, b| a.index_name == b.index_name) {
        let first = &group[0];
        if !group.iter().all(|row| row.is_plain && row.column_name.is_some()) {
            warn!(
                index = first.index_name.as_str(),
                table = first.table_name.as_str(),
                "Leaving out partial or expression index"
            );
            continue;
        }
        indexes.extend(group.iter().filter_map(|row| {
            Some(IndexInfo {
                index_name: row.index_name.clone(),
                table_name: row.table_name.clone(),
                column_name: row.column_name.clone()?,
                unique: row.is_unique,
                sort_order_code: row.asc_or_desc.clone(),
            })
        }));
    }
    indexes
}

fn decode_row(row: &PgRow, columns: &[ColumnInfo]) -> Result<Row, ProviderError> {
    let mut values = Vec::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        let value = match &col.type_code {
            TypeCode::SmallInt => row.try_get::<Option<i16>, _>(i)?.map(i64::from).into(),
            TypeCode::Integer => row.try_get::<Option<i32>, _>(i)?.map(i64::from).into(),
            TypeCode::BigInt => row.try_get::<Option<i64>, _>(i)?.into(),
            TypeCode::Real => row.try_get::<Option<f32>, _>(i)?.map(widen_real).into(),
            TypeCode::Double => row.try_get::<Option<f64>, _>(i)?.into(),
            TypeCode::Boolean => row.try_get::<Option<bool>, _>(i)?.into(),
            TypeCode::Null => Value::Null,
            _ => row.try_get::<Option<String>, _>(i)?.into(),
        };
        values.push(value);
    }
    Ok(Row::new(values))
}

// Goes through the shortest decimal form so 0.1f32 stays 0.1 rather than
// 0.10000000149011612.
fn widen_real(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}
