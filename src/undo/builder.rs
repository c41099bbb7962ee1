//! Inverse statement construction
//!
//! Pure functions from row images to SQL text. Nothing here executes a
//! statement; the caller applies the returned text.
//!
//! Known limitations, kept on purpose until executor-side row matching is
//! settled:
//! - UPDATE images are paired by position
//! - a multi-row INSERT is undone with one DELETE whose condition is the
//!   conjunction of every column of every inserted row, which only matches
//!   when a single row was inserted

use super::errors::{UndoError, UndoResult};
use super::table::table_from_statement;
use crate::wal::{RecordType, Row, RowImage, TransactionRecord, Value};

/// Inverse statements for a data record, most specific first.
///
/// Non-data records yield nothing. Absent images are treated as empty.
pub fn undo_statements(record: &TransactionRecord) -> UndoResult<Vec<String>> {
    if !record.record_type.is_data() {
        return Ok(Vec::new());
    }

    let statement = record.statement.as_deref().unwrap_or_default();
    let table = table_from_statement(statement)
        .ok_or_else(|| UndoError::UnknownTable(statement.to_string()))?;

    let empty = RowImage::empty();
    let before = record.before.as_ref().unwrap_or(&empty);
    let after = record.after.as_ref().unwrap_or(&empty);

    match record.record_type {
        RecordType::Update => update_inverse(&table, before, after),
        RecordType::Insert => Ok(insert_inverse(&table, after)),
        RecordType::Delete => Ok(delete_inverse(&table, before, after)),
        _ => Ok(Vec::new()),
    }
}

/// One `UPDATE` per row pair: restore `before[i]` where the row equals
/// `after[i]`. Pairs with an empty row are skipped.
pub fn update_inverse(table: &str, before: &RowImage, after: &RowImage) -> UndoResult<Vec<String>> {
    if before.count() != after.count() {
        return Err(UndoError::ImageLengthMismatch {
            before: before.count(),
            after: after.count(),
        });
    }

    Ok(before
        .rows()
        .iter()
        .zip(after.rows())
        .filter(|(old, new)| !old.is_empty() && !new.is_empty())
        .map(|(old, new)| {
            format!(
                "UPDATE {} SET {} WHERE {};",
                table,
                assignments(old),
                conditions(std::iter::once(new))
            )
        })
        .collect())
}

/// One `DELETE` matching every column of every inserted row
pub fn insert_inverse(table: &str, after: &RowImage) -> Vec<String> {
    let rows: Vec<&Row> = after.rows().iter().filter(|r| !r.is_empty()).collect();
    if rows.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "DELETE FROM {} WHERE {};",
        table,
        conditions(rows.into_iter())
    )]
}

/// One multi-row `INSERT` restoring the rows of `before` missing from
/// `after`; nothing if every row survived
pub fn delete_inverse(table: &str, before: &RowImage, after: &RowImage) -> Vec<String> {
    let removed: Vec<&Row> = before
        .rows()
        .iter()
        .filter(|row| !row.is_empty() && !after.rows().contains(row))
        .collect();
    let Some(first) = removed.first() else {
        return Vec::new();
    };

    let columns: Vec<&str> = first.column_names().collect();
    let tuples: Vec<String> = removed
        .iter()
        .map(|row| {
            let values: Vec<String> = columns
                .iter()
                .map(|c| row.get(c).map_or_else(|| Value::Null.to_sql(), Value::to_sql))
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();

    vec![format!(
        "INSERT INTO {} ({}) VALUES {};",
        table,
        columns.join(", "),
        tuples.join(", ")
    )]
}

fn assignments(row: &Row) -> String {
    row.iter()
        .map(|(column, value)| format!("{}={}", column, value.to_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn conditions<'a>(rows: impl Iterator<Item = &'a Row>) -> String {
    rows.flat_map(Row::iter)
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", column)
            } else {
                format!("{}={}", column, value.to_sql())
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}
