use serde::{Deserialize, Serialize};

use crate::extract::CodeBlock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub is_safe: bool,
    pub violations: Vec<String>,
}

impl SafetyReport {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            violations: Vec::new(),
        }
    }
}

/// Pre-execution check hook.
///
/// Currently permissive: every block is reported safe. Code runs with the
/// user's privileges either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyChecker;

impl SafetyChecker {
    pub fn check(&self, _block: &CodeBlock) -> SafetyReport {
        SafetyReport::safe()
    }
}
