use std::fmt::Write;

use crate::app::error::{DumpError, ProviderError};
use crate::app::models::{ColumnInfo, ForeignKeyInfo, IndexInfo, ScanResult, SortOrder};
use crate::app::quote::{double_quotify, literal};

/// Prefix of the surrogate table a view's rows are dumped into.
pub const VIEW_TABLE_PREFIX: &str = "view_";

/// Marker line between dump fragments.
pub const SEPARATOR: &str = "\n-- -- --\n";

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn view_table_name(view: &str) -> String {
        format!("{VIEW_TABLE_PREFIX}{view}")
    }

    pub fn create_table(
        table: &str,
        columns: &[ColumnInfo],
        primary_keys: &[String],
        foreign_keys: &[ForeignKeyInfo],
    ) -> Result<String, std::fmt::Error> {
        let mut clauses = Self::column_definitions(columns);

        if !primary_keys.is_empty() {
            clauses.push(format!(
                "PRIMARY KEY ({})",
                Self::identifier_list(primary_keys)
            ));
        }

        clauses.extend(
            Self::group_foreign_keys(foreign_keys)
                .into_iter()
                .map(Self::foreign_key_clause),
        );

        Self::drop_and_create(table, &clauses)
    }

    /// One ALTER TABLE per constraint, for foreign keys that cannot be
    /// declared inline because the referenced table is created later.
    pub fn add_foreign_keys(table: &str, foreign_keys: &[ForeignKeyInfo]) -> Vec<String> {
        Self::group_foreign_keys(foreign_keys)
            .into_iter()
            .map(|group| {
                format!(
                    "ALTER TABLE {} ADD {};",
                    double_quotify(table),
                    Self::foreign_key_clause(group)
                )
            })
            .collect()
    }

    pub fn create_view_table(
        view: &str,
        columns: &[ColumnInfo],
    ) -> Result<String, std::fmt::Error> {
        Self::drop_and_create(
            &Self::view_table_name(view),
            &Self::column_definitions(columns),
        )
    }

    /// One INSERT per scanned row, newline separated. `object` names the
    /// scanned source in errors; `target` is the table the rows go into.
    pub fn insert_statements(
        object: &str,
        target: &str,
        scan: &ScanResult,
    ) -> Result<String, DumpError> {
        let column_list = scan
            .columns
            .iter()
            .map(|col| double_quotify(&col.column_name))
            .collect::<Vec<_>>()
            .join(",");

        let mut output = String::new();
        for (n, row) in scan.rows.iter().enumerate() {
            if row.width() != scan.columns.len() {
                return Err(DumpError::scan(object)(ProviderError::RowWidth {
                    row: n,
                    expected: scan.columns.len(),
                    found: row.width(),
                }));
            }
            let values = scan
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| literal(object, column, row, i))
                .collect::<Result<Vec<_>, _>>()?;

            if n > 0 {
                output.push('\n');
            }
            write!(
                output,
                "INSERT INTO {} ( {} ) VALUES ( {} );",
                double_quotify(target),
                column_list,
                values.join(",")
            )?;
        }

        Ok(output)
    }

    /// One CREATE INDEX per index. Consecutive entries with the same index
    /// name are the key columns of one index, in key order.
    pub fn create_indexes(indexes: &[IndexInfo]) -> Result<Vec<String>, DumpError> {
        let mut statements = Vec::new();

        for group in indexes.chunk_by(Self::same_index) {
            let first = &group[0];
            let mut keys = Vec::with_capacity(group.len());
            for entry in group {
                let mut key = double_quotify(&entry.column_name);
                if let Some(code) = &entry.sort_order_code {
                    let order = SortOrder::from_code(code).ok_or_else(|| {
                        DumpError::UnknownSortOrder {
                            index: entry.index_name.clone(),
                            code: code.clone(),
                        }
                    })?;
                    write!(key, " {order}")?;
                }
                keys.push(key);
            }

            let mut statement = String::from("CREATE ");
            if first.unique {
                statement.push_str("UNIQUE ");
            }
            write!(
                statement,
                "INDEX {} ON {}({});",
                double_quotify(&first.index_name),
                double_quotify(&first.table_name),
                keys.join(", ")
            )?;
            statements.push(statement);
        }

        Ok(statements)
    }

    fn column_definitions(columns: &[ColumnInfo]) -> Vec<String> {
        columns
            .iter()
            .map(|col| {
                let mut definition =
                    format!("{} {}", double_quotify(&col.column_name), col.type_name);
                if !col.nullable {
                    definition.push_str(" NOT NULL");
                }
                definition
            })
            .collect()
    }

    fn drop_and_create(table: &str, clauses: &[String]) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        let quoted = double_quotify(table);
        write!(output, "DROP TABLE IF EXISTS {quoted}; ")?;
        write!(output, "CREATE TABLE {quoted} ( {} );", clauses.join(", "))?;
        Ok(output)
    }

    fn identifier_list<S: AsRef<str>>(names: &[S]) -> String {
        names
            .iter()
            .map(|name| double_quotify(name.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn foreign_key_clause(group: &[ForeignKeyInfo]) -> String {
        let local: Vec<&str> = group.iter().map(|fk| fk.column_name.as_str()).collect();
        let referenced: Vec<&str> = group.iter().map(|fk| fk.foreign_column_name.as_str()).collect();
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            Self::identifier_list(&local),
            double_quotify(&group[0].foreign_table_name),
            Self::identifier_list(&referenced)
        )
    }

    fn same_index(a: &IndexInfo, b: &IndexInfo) -> bool {
        a.index_name == b.index_name && a.table_name == b.table_name
    }

    fn group_foreign_keys(foreign_keys: &[ForeignKeyInfo]) -> Vec<&[ForeignKeyInfo]> {
        foreign_keys
            .chunk_by(|a, b| a.constraint_name == b.constraint_name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::app::models::{Row, Value};

    fn users_columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("id", "INTEGER", false),
            ColumnInfo::new("name", "VARCHAR", false),
        ]
    }

    fn fk(constraint: &str, column: &str, table: &str, referenced: &str) -> ForeignKeyInfo {
        ForeignKeyInfo {
            constraint_name: constraint.to_string(),
            column_name: column.to_string(),
            foreign_table_name: table.to_string(),
            foreign_column_name: referenced.to_string(),
        }
    }

    fn index(name: &str, column: &str, unique: bool, order: Option<&str>) -> IndexInfo {
        IndexInfo {
            index_name: name.to_string(),
            table_name: "orders".to_string(),
            column_name: column.to_string(),
            unique,
            sort_order_code: order.map(str::to_string),
        }
    }

    #[rstest]
    fn test_create_table_with_primary_key() {
        let ddl = SqlGenerator::create_table("USERS", &users_columns(), &["id".to_string()], &[])
            .unwrap();

        assert_eq!(
            ddl,
            "DROP TABLE IF EXISTS \"USERS\"; CREATE TABLE \"USERS\" ( \"id\" INTEGER NOT NULL, \
             \"name\" VARCHAR NOT NULL, PRIMARY KEY (\"id\") );"
        );
    }

    #[rstest]
    fn test_create_table_without_primary_key_omits_clause() {
        let columns = vec![ColumnInfo::new("note", "text", true)];
        let ddl = SqlGenerator::create_table("notes", &columns, &[], &[]).unwrap();

        assert_eq!(
            ddl,
            "DROP TABLE IF EXISTS \"notes\"; CREATE TABLE \"notes\" ( \"note\" text );"
        );
        assert!(!ddl.contains("PRIMARY KEY"));
    }

    #[rstest]
    fn test_primary_key_keeps_reported_order() {
        let columns = vec![
            ColumnInfo::new("a", "INTEGER", false),
            ColumnInfo::new("b", "INTEGER", false),
        ];
        let ddl = SqlGenerator::create_table(
            "pairs",
            &columns,
            &["b".to_string(), "a".to_string()],
            &[],
        )
        .unwrap();

        assert!(ddl.contains("PRIMARY KEY (\"b\", \"a\")"));
    }

    #[rstest]
    fn test_foreign_key_references_referenced_column() {
        let columns = vec![
            ColumnInfo::new("id", "INTEGER", false),
            ColumnInfo::new("owner_id", "INTEGER", true),
        ];
        let ddl = SqlGenerator::create_table(
            "pets",
            &columns,
            &["id".to_string()],
            &[fk("pets_owner_fk", "owner_id", "USERS", "id")],
        )
        .unwrap();

        assert!(ddl.ends_with(
            "PRIMARY KEY (\"id\"), FOREIGN KEY (\"owner_id\") REFERENCES \"USERS\"(\"id\") );"
        ));
        assert!(!ddl.contains("REFERENCES \"USERS\"(\"owner_id\")"));
    }

    #[rstest]
    fn test_composite_foreign_key_is_one_clause() {
        let columns = vec![
            ColumnInfo::new("x", "INTEGER", false),
            ColumnInfo::new("y", "INTEGER", false),
        ];
        let ddl = SqlGenerator::create_table(
            "child",
            &columns,
            &[],
            &[
                fk("child_fk", "x", "parent", "px"),
                fk("child_fk", "y", "parent", "py"),
            ],
        )
        .unwrap();

        assert!(ddl.contains("FOREIGN KEY (\"x\", \"y\") REFERENCES \"parent\"(\"px\", \"py\")"));
        assert_eq!(ddl.matches("FOREIGN KEY").count(), 1);
    }

    #[rstest]
    fn test_add_foreign_keys() {
        let statements = SqlGenerator::add_foreign_keys(
            "employees",
            &[
                fk("employees_manager_fk", "manager_id", "employees", "id"),
                fk("employees_team_fk", "team_id", "teams", "id"),
                fk("employees_team_fk", "team_region", "teams", "region"),
            ],
        );

        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"employees\" ADD FOREIGN KEY (\"manager_id\") REFERENCES \"employees\"(\"id\");",
                "ALTER TABLE \"employees\" ADD FOREIGN KEY (\"team_id\", \"team_region\") \
                 REFERENCES \"teams\"(\"id\", \"region\");",
            ]
        );
    }

    #[rstest]
    fn test_ddl_is_well_formed() {
        let ddl = SqlGenerator::create_table(
            "pets",
            &users_columns(),
            &["id".to_string()],
            &[fk("a", "name", "owners", "name"), fk("b", "id", "ids", "id")],
        )
        .unwrap();

        assert_eq!(ddl.matches(';').count(), 2);
        assert_eq!(ddl.matches('(').count(), ddl.matches(')').count());
        assert!(!ddl.contains(",)") && !ddl.contains(", )"));
    }

    #[rstest]
    fn test_create_view_table() {
        let columns = vec![ColumnInfo::new("total", "bigint", true)];
        let ddl = SqlGenerator::create_view_table("totals", &columns).unwrap();

        assert_eq!(
            ddl,
            "DROP TABLE IF EXISTS \"view_totals\"; CREATE TABLE \"view_totals\" ( \"total\" bigint );"
        );
    }

    #[rstest]
    fn test_insert_statements() {
        let scan = ScanResult {
            columns: users_columns(),
            rows: vec![
                Row::new(vec![1i64.into(), "Ann".into()]),
                Row::new(vec![2i64.into(), "Bo".into()]),
            ],
        };

        let dml = SqlGenerator::insert_statements("USERS", "USERS", &scan).unwrap();
        assert_eq!(
            dml,
            "INSERT INTO \"USERS\" ( \"id\",\"name\" ) VALUES ( 1,'Ann' );\n\
             INSERT INTO \"USERS\" ( \"id\",\"name\" ) VALUES ( 2,'Bo' );"
        );
    }

    #[rstest]
    fn test_insert_value_count_matches_columns() {
        let scan = ScanResult {
            columns: vec![
                ColumnInfo::new("id", "INTEGER", false),
                ColumnInfo::new("nickname", "VARCHAR", true),
                ColumnInfo::new("score", "REAL", true),
            ],
            rows: vec![Row::new(vec![7i64.into(), Value::Null, 0.25f64.into()])],
        };

        let dml = SqlGenerator::insert_statements("t", "t", &scan).unwrap();
        assert!(dml.ends_with("VALUES ( 7,NULL,0.25 );"));
    }

    #[rstest]
    #[case::short_row(vec![1i64.into()])]
    #[case::long_row(vec![1i64.into(), "Ann".into(), true.into()])]
    fn test_row_width_must_match_columns(#[case] values: Vec<Value>) {
        let scan = ScanResult {
            columns: users_columns(),
            rows: vec![Row::new(vec![0i64.into(), "Al".into()]), Row::new(values.clone())],
        };

        let err = SqlGenerator::insert_statements("USERS", "USERS", &scan).unwrap_err();
        assert!(matches!(
            err,
            DumpError::Scan {
                ref object,
                source: ProviderError::RowWidth { row: 1, expected: 2, found },
            } if object == "USERS" && found == values.len()
        ));
    }

    #[rstest]
    fn test_insert_statements_for_empty_scan() {
        let scan = ScanResult {
            columns: users_columns(),
            rows: vec![],
        };

        assert_eq!(SqlGenerator::insert_statements("t", "t", &scan).unwrap(), "");
    }

    #[rstest]
    #[case::unique_ascending(true, Some("A"), "CREATE UNIQUE INDEX \"idx\" ON \"orders\"(\"placed_at\" ASC);")]
    #[case::descending(false, Some("D"), "CREATE INDEX \"idx\" ON \"orders\"(\"placed_at\" DESC);")]
    #[case::no_order(false, None, "CREATE INDEX \"idx\" ON \"orders\"(\"placed_at\");")]
    fn test_create_index(#[case] unique: bool, #[case] order: Option<&str>, #[case] expected: &str) {
        let statements =
            SqlGenerator::create_indexes(&[index("idx", "placed_at", unique, order)]).unwrap();

        assert_eq!(statements, vec![expected.to_string()]);
    }

    #[rstest]
    fn test_multi_column_index_is_grouped() {
        let statements = SqlGenerator::create_indexes(&[
            index("by_customer", "customer_id", false, Some("A")),
            index("by_customer", "placed_at", false, Some("D")),
            index("by_ref", "reference", true, None),
        ])
        .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE INDEX \"by_customer\" ON \"orders\"(\"customer_id\" ASC, \"placed_at\" DESC);",
                "CREATE UNIQUE INDEX \"by_ref\" ON \"orders\"(\"reference\");",
            ]
        );
    }

    #[rstest]
    fn test_unknown_sort_order_is_an_error() {
        let err = SqlGenerator::create_indexes(&[index("idx", "c", false, Some("Z"))]).unwrap_err();

        assert!(matches!(
            err,
            DumpError::UnknownSortOrder { ref index, ref code } if index == "idx" && code == "Z"
        ));
    }
}
