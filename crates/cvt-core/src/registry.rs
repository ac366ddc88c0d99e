//! Target registry abstraction.
//!
//! The override listing needs the set of known targets per scope. That set is
//! owned by another subsystem, so the engine only sees this trait.

use crate::error::Result;

/// Source of the target names known in a scope.
pub trait TargetRegistry: Send + Sync {
    /// Target names in the scope, in a stable order.
    fn names(&self, scope: &str) -> Result<Vec<String>>;
}

/// Fixed target list, identical for every scope.
#[derive(Debug, Clone, Default)]
pub struct StaticTargetRegistry {
    names: Vec<String>,
}

impl StaticTargetRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }
}

impl TargetRegistry for StaticTargetRegistry {
    fn names(&self, _scope: &str) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }
}
