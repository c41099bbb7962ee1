//! Reverse scan shared by selective rollback and crash recovery

use std::collections::BTreeSet;

use super::criteria::PlannedStatement;
use super::errors::{RecoveryError, RecoveryResult};
use crate::observability::Logger;
use crate::undo::undo_statements;
use crate::wal::{RecordType, TransactionId, TransactionRecord};

/// Walk `records` newest first, planning inverses for every pending
/// transaction until each has reached its START.
///
/// Returns the ids whose START was found; they are removed from `pending`.
/// Stops early once `pending` is empty.
pub(crate) fn undo_pass<'a>(
    records: impl Iterator<Item = &'a TransactionRecord>,
    pending: &mut BTreeSet<TransactionId>,
    plan: &mut Vec<PlannedStatement>,
) -> RecoveryResult<BTreeSet<TransactionId>> {
    let mut finished = BTreeSet::new();

    for record in records {
        if pending.is_empty() {
            break;
        }
        let transaction_id = record.transaction_id;
        if !pending.contains(&transaction_id) {
            continue;
        }

        match record.record_type {
            RecordType::Start => {
                pending.remove(&transaction_id);
                finished.insert(transaction_id);
            }
            kind if kind.is_data() => {
                if kind == RecordType::Insert && record.after.as_ref().map_or(0, |a| a.count()) > 1 {
                    Logger::warn(
                        "UNDO_MULTI_ROW_INSERT",
                        &[
                            ("transaction_id", &transaction_id.to_string()),
                            ("reason", "single DELETE matches only a one-row insert"),
                        ],
                    );
                }
                let statements = undo_statements(record)
                    .map_err(|e| RecoveryError::undo_failed(transaction_id, e))?;
                plan.extend(
                    statements
                        .into_iter()
                        .map(|s| PlannedStatement::new(transaction_id, s)),
                );
            }
            _ => {}
        }
    }

    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::RecoveryErrorCode;
    use crate::wal::{Row, RowImage};

    fn row(id: i64, name: &str) -> RowImage {
        RowImage::new(vec![Row::new().with("id", id).with("name", name)])
    }

    #[test]
    fn test_stops_at_start_and_skips_other_transactions() {
        let records = vec![
            TransactionRecord::start(1),
            TransactionRecord::start(2),
            TransactionRecord::insert(2, "INSERT INTO t (id, name) VALUES (5, 'e');", row(5, "e")),
            TransactionRecord::update(1, "UPDATE t SET name='b' WHERE id=1", row(1, "a"), row(1, "b")),
        ];
        let mut pending = BTreeSet::from([1]);
        let mut plan = Vec::new();

        let finished = undo_pass(records.iter().rev(), &mut pending, &mut plan).unwrap();

        assert_eq!(finished, BTreeSet::from([1]));
        assert!(pending.is_empty());
        assert_eq!(
            plan,
            vec![PlannedStatement::new(
                1,
                "UPDATE t SET id=1, name='a' WHERE id=1 AND name='b';"
            )]
        );
    }

    #[test]
    fn test_missing_start_stays_pending() {
        let records = vec![TransactionRecord::insert(
            3,
            "INSERT INTO t (id, name) VALUES (2, 'x');",
            row(2, "x"),
        )];
        let mut pending = BTreeSet::from([3]);
        let mut plan = Vec::new();

        let finished = undo_pass(records.iter().rev(), &mut pending, &mut plan).unwrap();

        assert!(finished.is_empty());
        assert_eq!(pending, BTreeSet::from([3]));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_undo_error_names_transaction() {
        let records = vec![TransactionRecord::update(
            8,
            "UPDATE t SET name='b'",
            row(1, "a"),
            RowImage::empty(),
        )];
        let mut pending = BTreeSet::from([8]);
        let err = undo_pass(records.iter(), &mut pending, &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), RecoveryErrorCode::RecoveryUndoFailed);
        assert_eq!(err.transaction_id(), Some(8));
    }
}
