use std::fmt;

/// Why a single argument field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Required,
    OutOfRange,
    Malformed,
}

/// One violated field or rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub message: String,
}

/// Aggregate validation failure listing every violated field at once, so a
/// caller can fix all problems in one round trip instead of resubmitting per
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, kind: ViolationKind, message: impl Into<String>) {
        self.0.push(Violation {
            field,
            kind,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// True if any violation is of the given kind.
    pub fn contains(&self, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.kind == kind)
    }

    /// True if the given field was rejected for the given reason.
    pub fn matches(&self, field: &str, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.field == field && v.kind == kind)
    }

    /// Ok(()) when nothing was violated, otherwise the full collection.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_violations() {
        let mut errs = ValidationErrors::new();
        errs.push("url", ViolationKind::Required, "url is required");
        errs.push("max_pages", ViolationKind::OutOfRange, "must be at least 1");

        assert_eq!(errs.violations().len(), 2);
        assert!(errs.contains(ViolationKind::Required));
        assert!(errs.matches("max_pages", ViolationKind::OutOfRange));
        assert!(!errs.matches("url", ViolationKind::OutOfRange));

        let msg = errs.to_string();
        assert!(msg.contains("url is required"));
        assert!(msg.contains("max_pages"));
    }

    #[test]
    fn empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
