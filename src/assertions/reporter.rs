//! # Failure Reporting
//!
//! Assertion failures are values. A [`Reporter`] decides what happens to
//! them: [`PanicReporter`] hands them to the test harness, while
//! [`CollectingReporter`] keeps them for later inspection.

use crate::request::PLACEHOLDER;
use regex::Captures;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Status code did not meet the expectation
    Status,
    /// `satisfy` found nothing to deserialize
    EmptyOrMissingBody,
    /// One or more checks inside a `satisfy` block failed
    Inspector,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AssertionFailure {
    kind: FailureKind,
    message: String,
    details: Vec<String>,
}

impl AssertionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// A failure aggregating the sub-failures of an inspector block
    pub fn composite(header: impl Into<String>, details: Vec<String>) -> Self {
        let header = header.into();
        let message = format!("{header}\n{}", details.join("\n"));
        Self {
            kind: FailureKind::Inspector,
            message,
            details,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Individual sub-failures, in the order they were recorded
    pub fn details(&self) -> &[String] {
        &self.details
    }
}

/// Result of one assertion, after it has been reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(AssertionFailure),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn failure(&self) -> Option<&AssertionFailure> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, failure: &AssertionFailure);
}

/// Fails the current test by panicking with the failure message
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, failure: &AssertionFailure) {
        panic!("{failure}");
    }
}

/// Records failures instead of raising them
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    failures: Arc<Mutex<Vec<AssertionFailure>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<AssertionFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<AssertionFailure> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_empty(&self) -> bool {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, failure: &AssertionFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}

/// Optional reason spliced into a failure message.
///
/// `{0}`, `{1}`, ... in the template are replaced by the arguments, and only
/// when a message is actually rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Because {
    template: String,
    args: Vec<String>,
}

impl Because {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, A>(template: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: fmt::Display,
    {
        Self {
            template: template.into(),
            args: args.into_iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.template.trim().is_empty()
    }

    /// `" because <reason>"`, or an empty string when there is no reason
    pub fn render(&self) -> String {
        let template = self.template.trim();
        if template.is_empty() {
            return String::new();
        }
        let reason = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| self.args.get(i))
                .map_or_else(|| caps[0].to_string(), Clone::clone)
        });
        if reason.to_lowercase().starts_with("because ") {
            format!(" {reason}")
        } else {
            format!(" because {reason}")
        }
    }
}

impl From<&str> for Because {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for Because {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}
