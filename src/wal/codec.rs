//! Line codec for the persisted log
//!
//! One record per line, UTF-8:
//!
//! ```text
//! KIND,transaction_id,timestamp,statement_or_None,Before: <image>,After: <image>
//! CHECKPOINT,timestamp,[id, id, ...]
//! ```
//!
//! Timestamps are RFC 3339 UTC. Images use the row-image literal from
//! `row.rs`, or `None` when absent.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use super::errors::{WalError, WalResult};
use super::record::{CheckpointRecord, LogRecord, RecordType, TransactionId, TransactionRecord};
use super::row::{decode_image, encode_image, ABSENT};

const CHECKPOINT_KIND: &str = "CHECKPOINT";
const BEFORE_MARKER: &str = ",Before: ";
const AFTER_MARKER: &str = ",After: ";

/// Encode a record as one log line, without the trailing newline
pub fn encode_record(record: &LogRecord) -> String {
    match record {
        LogRecord::Transaction(r) => encode_transaction(r),
        LogRecord::Checkpoint(c) => encode_checkpoint(c),
    }
}

pub(crate) fn encode_transaction(record: &TransactionRecord) -> String {
    let statement = match record.statement.as_deref() {
        Some(s) => single_line(s),
        None => ABSENT.to_string(),
    };
    format!(
        "{},{},{},{}{}{}{}{}",
        record.record_type,
        record.transaction_id,
        format_timestamp(&record.timestamp),
        statement,
        BEFORE_MARKER,
        encode_image(record.before.as_ref()),
        AFTER_MARKER,
        encode_image(record.after.as_ref()),
    )
}

pub(crate) fn encode_checkpoint(record: &CheckpointRecord) -> String {
    format!(
        "{},{},{}",
        CHECKPOINT_KIND,
        format_timestamp(&record.timestamp),
        format_id_list(&record.active_transactions)
    )
}

/// Decode one log line
pub fn decode_line(line: &str) -> WalResult<LogRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (kind, rest) = line
        .split_once(',')
        .ok_or_else(|| WalError::corruption("line has no fields"))?;

    if kind == CHECKPOINT_KIND {
        return decode_checkpoint(rest).map(LogRecord::Checkpoint);
    }

    let record_type: RecordType = kind.parse().map_err(WalError::corruption)?;
    decode_transaction(record_type, rest).map(LogRecord::Transaction)
}

fn decode_checkpoint(rest: &str) -> WalResult<CheckpointRecord> {
    let (timestamp, ids) = rest
        .split_once(',')
        .ok_or_else(|| WalError::corruption("checkpoint line missing id list"))?;
    let ids: Vec<TransactionId> = serde_json::from_str(ids.trim())
        .map_err(|e| WalError::corruption(format!("malformed checkpoint id list: {}", e)))?;
    Ok(CheckpointRecord {
        timestamp: parse_timestamp(timestamp)?,
        active_transactions: ids.into_iter().collect(),
    })
}

fn decode_transaction(record_type: RecordType, rest: &str) -> WalResult<TransactionRecord> {
    let mut fields = rest.splitn(3, ',');
    let id_field = fields.next().unwrap_or_default();
    let ts_field = fields
        .next()
        .ok_or_else(|| WalError::corruption("line missing timestamp"))?;
    let payload = fields
        .next()
        .ok_or_else(|| WalError::corruption("line missing statement and images"))?;

    let transaction_id: TransactionId = id_field.trim().parse().map_err(|_| {
        WalError::corruption(format!("invalid transaction id '{}'", id_field))
    })?;
    let timestamp = parse_timestamp(ts_field)?;

    // Markers may also occur inside the statement or inside text values, so
    // try each candidate split from the right until both images decode.
    for (after_at, _) in payload.rmatch_indices(AFTER_MARKER) {
        let Ok(after) = decode_image(&payload[after_at + AFTER_MARKER.len()..]) else {
            continue;
        };
        let head = &payload[..after_at];
        for (before_at, _) in head.rmatch_indices(BEFORE_MARKER) {
            let Ok(before) = decode_image(&head[before_at + BEFORE_MARKER.len()..]) else {
                continue;
            };
            let statement = &head[..before_at];
            let statement = (statement != ABSENT).then(|| statement.to_string());
            return Ok(TransactionRecord {
                record_type,
                transaction_id,
                timestamp,
                statement,
                before,
                after,
            });
        }
    }

    Err(WalError::corruption("missing or malformed Before/After images"))
}

/// RFC 3339, UTC, fractional seconds only when non-zero
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts RFC 3339 or a naive ISO 8601 timestamp (taken as UTC)
pub fn parse_timestamp(field: &str) -> WalResult<DateTime<Utc>> {
    let field = field.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(field) {
        return Ok(ts.with_timezone(&Utc));
    }
    field
        .parse::<NaiveDateTime>()
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| WalError::corruption(format!("invalid timestamp '{}'", field)))
}

fn format_id_list(ids: &BTreeSet<TransactionId>) -> String {
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", joined.join(", "))
}

fn single_line(statement: &str) -> String {
    statement.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::row::{Row, RowImage};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 10, 10, 0, 0).unwrap()
    }

    fn image(id: i64, name: &str) -> RowImage {
        RowImage::new(vec![Row::new().with("id", id).with("name", name)])
    }

    #[test]
    fn test_encode_update_line() {
        let record = TransactionRecord::update(
            1,
            "UPDATE table_name SET name='new_value' WHERE id=1",
            image(1, "old_value"),
            image(1, "new_value"),
        )
        .at(fixed_time());

        assert_eq!(
            encode_transaction(&record),
            "UPDATE,1,2024-12-10T10:00:00Z,UPDATE table_name SET name='new_value' WHERE id=1,\
             Before: [{\"id\":1,\"name\":\"old_value\"}],After: [{\"id\":1,\"name\":\"new_value\"}]"
        );
    }

    #[test]
    fn test_encode_start_line_uses_none() {
        let record = TransactionRecord::start(3).at(fixed_time());
        assert_eq!(
            encode_transaction(&record),
            "START,3,2024-12-10T10:00:00Z,None,Before: None,After: None"
        );
    }

    #[test]
    fn test_encode_checkpoint_line() {
        let empty = CheckpointRecord {
            timestamp: fixed_time(),
            active_transactions: BTreeSet::new(),
        };
        assert_eq!(encode_checkpoint(&empty), "CHECKPOINT,2024-12-10T10:00:00Z,[]");

        let three = CheckpointRecord {
            timestamp: fixed_time(),
            active_transactions: BTreeSet::from([3, 1, 2]),
        };
        assert_eq!(encode_checkpoint(&three), "CHECKPOINT,2024-12-10T10:00:00Z,[1, 2, 3]");
    }

    #[test]
    fn test_decode_transaction_line() {
        let line = "UPDATE,1,2024-12-10T10:00:00,UPDATE table_name SET name='new_value' WHERE id=1,\
                    Before: [{\"id\": 1, \"name\": \"old_value\"}],After: [{\"id\": 1, \"name\": \"new_value\"}]";
        let LogRecord::Transaction(r) = decode_line(line).unwrap() else {
            panic!("expected transaction record");
        };
        assert_eq!(r.record_type, RecordType::Update);
        assert_eq!(r.transaction_id, 1);
        assert_eq!(r.timestamp, fixed_time());
        assert_eq!(
            r.statement.as_deref(),
            Some("UPDATE table_name SET name='new_value' WHERE id=1")
        );
        assert_eq!(r.before, Some(image(1, "old_value")));
        assert_eq!(r.after, Some(image(1, "new_value")));
    }

    #[test]
    fn test_decode_checkpoint_line() {
        let LogRecord::Checkpoint(c) = decode_line("CHECKPOINT,2024-12-10T11:00:00Z,[1, 2, 3]").unwrap()
        else {
            panic!("expected checkpoint");
        };
        assert_eq!(c.active_transactions, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_markers_inside_statement_and_values() {
        let record = TransactionRecord::update(
            9,
            "UPDATE notes SET body='x,After: y' WHERE body=',Before: z'",
            RowImage::new(vec![Row::new().with("body", ",Before: z")]),
            RowImage::new(vec![Row::new().with("body", "x,After: y")]),
        )
        .at(fixed_time());

        let decoded = decode_line(&encode_transaction(&record)).unwrap();
        assert_eq!(decoded, LogRecord::Transaction(record));
    }

    #[test]
    fn test_statement_line_breaks_are_flattened() {
        let record = TransactionRecord::insert(
            4,
            "INSERT INTO t (id)\nVALUES (1);",
            RowImage::new(vec![Row::new().with("id", 1)]),
        );
        let line = encode_transaction(&record);
        assert!(!line.contains('\n'));
        let decoded = decode_line(&line).unwrap();
        assert_eq!(
            decoded.as_transaction().unwrap().statement.as_deref(),
            Some("INSERT INTO t (id) VALUES (1);")
        );
    }

    #[test]
    fn test_fractional_timestamp_survives() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::microseconds(250);
        let record = TransactionRecord::commit(5).at(ts);
        let decoded = decode_line(&encode_transaction(&record)).unwrap();
        assert_eq!(decoded.timestamp(), ts);
    }

    #[test]
    fn test_malformed_lines_are_corruption() {
        for line in [
            "garbage",
            "FOO,1,2024-12-10T10:00:00Z,None,Before: None,After: None",
            "START,abc,2024-12-10T10:00:00Z,None,Before: None,After: None",
            "START,1,yesterday,None,Before: None,After: None",
            "UPDATE,1,2024-12-10T10:00:00Z,UPDATE t SET a=1",
            "UPDATE,1,2024-12-10T10:00:00Z,x,Before: [{'id': 1}],After: []",
            "CHECKPOINT,2024-12-10T10:00:00Z,[1, 'two']",
        ] {
            let err = decode_line(line).unwrap_err();
            assert_eq!(err.code().code(), "WAL_LOG_CORRUPTION", "line: {}", line);
        }
    }
}
