use crate::app::error::DumpError;
use crate::app::models::{ColumnInfo, Row, TypeCode};

/// Single-quoted SQL string literal. Only ever used for values.
pub fn quotify(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Double-quoted SQL identifier.
pub fn double_quotify(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Renders the cell at `index` as a SQL literal according to the column's
/// type code.
pub fn literal(
    object: &str,
    column: &ColumnInfo,
    row: &Row,
    index: usize,
) -> Result<String, DumpError> {
    let unsupported = || DumpError::UnsupportedType {
        object: object.to_string(),
        column: column.column_name.clone(),
        type_name: column.type_name.clone(),
    };

    // Unsupported types fail even for null cells.
    if let TypeCode::Other(_) = column.type_code {
        return Err(unsupported());
    }
    let is_null = row.is_null(index).map_err(DumpError::scan(object))?;
    if column.type_code == TypeCode::Null || is_null {
        return Ok("NULL".to_string());
    }

    let rendered = match &column.type_code {
        TypeCode::Char
        | TypeCode::VarChar
        | TypeCode::LongVarChar
        | TypeCode::Date
        | TypeCode::Time
        | TypeCode::Timestamp => quotify(row.text(index).map_err(DumpError::scan(object))?),
        TypeCode::Numeric | TypeCode::Decimal => {
            let text = row.text(index).map_err(DumpError::scan(object))?;
            numeric_literal(text)
        }
        TypeCode::SmallInt | TypeCode::Integer | TypeCode::BigInt => row
            .integer(index)
            .map_err(DumpError::scan(object))?
            .to_string(),
        TypeCode::Real | TypeCode::Double => {
            float_literal(row.float(index).map_err(DumpError::scan(object))?)
        }
        TypeCode::Boolean => {
            if row.boolean(index).map_err(DumpError::scan(object))? {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        TypeCode::Null | TypeCode::Other(_) => return Err(unsupported()),
    };
    Ok(rendered)
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        quotify("NaN")
    } else if value.is_infinite() {
        quotify(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        value.to_string()
    }
}

// Numeric text is emitted bare; PostgreSQL's 'NaN' numeric has no bare form.
fn numeric_literal(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
        trimmed.to_string()
    } else {
        quotify(trimmed)
    }
}
