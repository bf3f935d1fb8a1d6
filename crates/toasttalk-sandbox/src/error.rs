//! Sandbox error types.
//!
//! Execution itself never fails; problems running a block are reported in
//! its [`ExecutionResult`](crate::ExecutionResult).

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unsupported language tag: {0}")]
    UnsupportedLanguage(String),
}
