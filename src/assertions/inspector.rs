//! # Inspector
//!
//! Scoped failure collector handed to `satisfy` blocks. Checks append to the
//! collector instead of aborting, so every failing check in a block is seen.

use super::reporter::Because;
use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Default)]
pub struct Inspector {
    failures: Vec<String>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `condition` holds
    pub fn check(&mut self, condition: bool, message: impl Into<String>) -> &mut Self {
        if !condition {
            self.failures.push(message.into());
        }
        self
    }

    pub fn equal<T>(
        &mut self,
        subject: &str,
        actual: &T,
        expected: &T,
        because: impl Into<Because>,
    ) -> &mut Self
    where
        T: PartialEq + Debug + ?Sized,
    {
        if actual != expected {
            let because = because.into().render();
            self.failures.push(format!(
                "Expected {subject} to be {expected:?}{because}, but found {actual:?}."
            ));
        }
        self
    }

    pub fn not_equal<T>(
        &mut self,
        subject: &str,
        actual: &T,
        unexpected: &T,
        because: impl Into<Because>,
    ) -> &mut Self
    where
        T: PartialEq + Debug + ?Sized,
    {
        if actual == unexpected {
            let because = because.into().render();
            self.failures.push(format!(
                "Expected {subject} not to be {unexpected:?}{because}, but it was."
            ));
        }
        self
    }

    pub fn contains(
        &mut self,
        subject: &str,
        haystack: &str,
        needle: &str,
        because: impl Into<Because>,
    ) -> &mut Self {
        if !haystack.contains(needle) {
            let because = because.into().render();
            self.failures.push(format!(
                "Expected {subject} {haystack:?} to contain {needle:?}{because}."
            ));
        }
        self
    }

    /// Record an unconditional failure
    pub fn fail(&mut self, message: impl Into<String>) -> &mut Self {
        self.failures.push(message.into());
        self
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Run `block` in a fresh scope and return what it recorded, in order.
    ///
    /// A panic escaping the block is recorded as one more failure, so the
    /// scope is always drained.
    pub fn collect<F>(block: F) -> Vec<String>
    where
        F: FnOnce(&mut Inspector),
    {
        let mut inspector = Inspector::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| block(&mut inspector)));
        if let Err(payload) = result {
            inspector.failures.push(panic_message(payload.as_ref()));
        }
        inspector.failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "inspector panicked".to_string()
    }
}
