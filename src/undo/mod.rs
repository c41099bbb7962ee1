//! Undo statement builder
//!
//! Turns the before/after images of a data record into the SQL that
//! reverses it:
//!
//! | Record | Inverse |
//! |--------|---------|
//! | UPDATE | `UPDATE t SET <before> WHERE <after>;` per row pair |
//! | INSERT | `DELETE FROM t WHERE <after>;` |
//! | DELETE | `INSERT INTO t (...) VALUES (...), ...;` for rows missing from `after` |

mod builder;
mod errors;
mod table;

pub use builder::{delete_inverse, insert_inverse, undo_statements, update_inverse};
pub use errors::{UndoError, UndoResult};
pub use table::table_from_statement;
