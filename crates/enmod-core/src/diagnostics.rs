//! Diagnostics collected while checking or compiling a dataset.
//!
//! Supports:
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (duplicate, registry, reference, resolution, ...)
//! - Optional element references (e.g. "Arrow:BaseArrow:A")
//! - Optional dataset positions
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use enmod_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_for("validation", "balance has no connected flows", "Balance:B");
//! diag.add_error_for("reference", "missing element Flow:F2", "Arrow:BaseArrow:A");
//!
//! assert_eq!(diag.error_count(), 1);
//! assert_eq!(diag.summary(), "1 warning, 1 error");
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but compilation can proceed
    Warning,
    /// The dataset cannot be compiled as is
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g. "duplicate", "reference", "resolution")
    pub category: String,
    pub message: String,
    /// Element the issue belongs to, as `Concept:Type:instance`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// Position of the element in the input collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            element: None,
            position: None,
        }
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(element) = &self.element {
            write!(f, " ({})", element)?;
        }
        if let Some(position) = self.position {
            write!(f, " at position {}", position)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning_for(&mut self, category: &str, message: &str, element: &str) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Warning, category, message).with_element(element),
        );
    }

    pub fn add_error_for(&mut self, category: &str, message: &str, element: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_element(element));
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn summary(&self) -> String {
        let errors = self.error_count();
        let warnings = self.issues.len() - errors;

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, plural(w)),
            (0, e) => format!("{} error{}", e, plural(e)),
            (w, e) => format!("{} warning{}, {} error{}", w, plural(w), e, plural(e)),
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
