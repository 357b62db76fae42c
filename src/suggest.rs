//! Collected "you may also want" hints.
//!
//! While resolving, modules come across dependencies that are not required
//! (apt's `<name>` descriptors). They are recorded here so the CLI can print
//! them once the run is over.

use std::fmt;
use std::sync::Mutex;

/// One hint: `from` (in `module`) suggests installing `suggested`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Module that produced the suggestion
    pub module: String,
    /// Item whose resolution surfaced it
    pub from: String,
    /// The suggested item
    pub suggested: String,
}

impl Suggestion {
    /// Build a suggestion.
    pub fn new(
        module: impl Into<String>,
        from: impl Into<String>,
        suggested: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            from: from.into(),
            suggested: suggested.into(),
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} suggests '{}' (credo {} {})",
            self.from, self.suggested, self.module, self.suggested
        )
    }
}

/// Thread-safe, append-only sink of [`Suggestion`]s.
#[derive(Debug, Default)]
pub struct Suggestions {
    entries: Mutex<Vec<Suggestion>>,
}

impl Suggestions {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a suggestion.
    pub fn register(&self, suggestion: Suggestion) {
        tracing::debug!(target: "modules", "Suggestion: {}", suggestion);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(suggestion);
        }
    }

    /// Snapshot of everything registered so far, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<Suggestion> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Drain the sink.
    pub fn take(&self) -> Vec<Suggestion> {
        self.entries.lock().map(|mut entries| std::mem::take(&mut *entries)).unwrap_or_default()
    }

    /// Number of recorded suggestions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or_default()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_preserves_order() {
        let sink = Suggestions::new();
        sink.register(Suggestion::new("apt", "python3", "python3-doc"));
        sink.register(Suggestion::new("apt", "python3", "python3-tk"));

        let all = sink.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].suggested, "python3-doc");
        assert_eq!(all[1].suggested, "python3-tk");
    }

    #[test]
    fn test_take_drains() {
        let sink = Suggestions::new();
        sink.register(Suggestion::new("apt", "curl", "ca-certificates"));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_display() {
        let s = Suggestion::new("apt", "python3", "python3-doc");
        assert_eq!(s.to_string(), "python3 suggests 'python3-doc' (credo apt python3-doc)");
    }
}
