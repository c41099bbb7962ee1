//! Begin/complete logging around a unit of work
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` (with `elapsed_ms`) on `complete`
//! - `{name}_FAILED` on `fail`
//! - `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs start and end of an operation
pub struct ObservationScope {
    name: &'static str,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    /// Open a scope; logs `{name}_BEGIN`
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Open a scope with fields on the begin line
    pub fn with_fields(name: &'static str, fields: &[(&str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_ms(&self) -> String {
        self.started.elapsed().as_millis().to_string()
    }

    /// Close the scope successfully
    pub fn complete(self, fields: &[(&str, &str)]) {
        let mut this = self;
        this.finished = true;
        let elapsed = this.elapsed_ms();
        let mut all: Vec<(&str, &str)> = fields.to_vec();
        all.push(("elapsed_ms", &elapsed));
        Logger::info(&format!("{}_COMPLETE", this.name), &all);
    }

    /// Close the scope as failed
    pub fn fail(self, reason: &str) {
        let mut this = self;
        this.finished = true;
        Logger::error(&format!("{}_FAILED", this.name), &[("reason", reason)]);
    }

    /// True once `complete` or `fail` has run
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scope_is_open() {
        let scope = ObservationScope::new("TEST");
        assert!(!scope.is_finished());
        scope.complete(&[]);
    }

    #[test]
    fn test_complete_with_fields() {
        let scope = ObservationScope::with_fields("TEST", &[("store", "wal.log")]);
        scope.complete(&[("statements", "3")]);
    }

    #[test]
    fn test_fail_and_drop_do_not_panic() {
        ObservationScope::new("TEST").fail("disk full");
        drop(ObservationScope::new("TEST"));
    }
}
