//! Mass-assignment protection.

/// Allow-list and deny-list for mass assignment.
///
/// By default every key is guarded (`["*"]`) and nothing is fillable, the
/// "totally guarded" state in which filling any key is an error. A model that
/// lists no fillable keys but guards specific ones accepts everything else
/// except keys starting with `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassAssignmentGuard {
    fillable: Vec<String>,
    guarded: Vec<String>,
    unguarded: bool,
}

impl Default for MassAssignmentGuard {
    fn default() -> Self {
        Self {
            fillable: Vec::new(),
            guarded: vec!["*".to_string()],
            unguarded: false,
        }
    }
}

impl MassAssignmentGuard {
    /// Creates a totally guarded guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guard that accepts every key.
    pub fn unguarded() -> Self {
        Self {
            unguarded: true,
            ..Self::default()
        }
    }

    /// Sets the fillable keys.
    pub fn with_fillable<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fillable = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the guarded keys.
    pub fn with_guarded<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guarded = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the fillable keys.
    pub fn fillable(&self) -> &[String] {
        &self.fillable
    }

    /// Returns the guarded keys.
    pub fn guarded(&self) -> &[String] {
        &self.guarded
    }

    /// Returns true if guarding is switched off.
    pub fn is_unguarded(&self) -> bool {
        self.unguarded
    }

    /// Returns true if `key` may be mass-assigned.
    pub fn is_fillable(&self, key: &str) -> bool {
        if self.unguarded || self.fillable.iter().any(|k| k == key) {
            return true;
        }
        if self.is_guarded(key) {
            return false;
        }
        self.fillable.is_empty() && !key.starts_with('_')
    }

    /// Returns true if `key` is explicitly or wildcard guarded.
    pub fn is_guarded(&self, key: &str) -> bool {
        if self.unguarded {
            return false;
        }
        self.guarded.iter().any(|k| k == "*" || k == key)
    }

    /// Returns true if nothing is fillable and everything is guarded.
    pub fn is_totally_guarded(&self) -> bool {
        !self.unguarded && self.fillable.is_empty() && self.guarded.iter().any(|k| k == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_totally_guarded() {
        let guard = MassAssignmentGuard::new();
        assert!(guard.is_totally_guarded());
        assert!(!guard.is_fillable("title"));
    }

    #[test]
    fn test_fillable_allow_list() {
        let guard = MassAssignmentGuard::new().with_fillable(["title"]);
        assert!(guard.is_fillable("title"));
        assert!(!guard.is_fillable("views"));
        assert!(!guard.is_totally_guarded());
    }

    #[test]
    fn test_explicit_guarded_keys() {
        let guard = MassAssignmentGuard::new().with_guarded(["secret"]);
        assert!(guard.is_fillable("title"));
        assert!(!guard.is_fillable("secret"));
        assert!(!guard.is_fillable("_id"));
    }

    #[test]
    fn test_unguarded_accepts_everything() {
        let guard = MassAssignmentGuard::unguarded();
        assert!(guard.is_fillable("_anything"));
        assert!(!guard.is_totally_guarded());
    }
}
