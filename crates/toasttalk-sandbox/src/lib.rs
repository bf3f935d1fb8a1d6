//! Fenced code execution for Toast Talk.
//!
//! The model marks code it wants executed with a `run_` fence tag
//! (` ```run_python `, ` ```run_bash `, ` ```run_javascript `). Plain fences are
//! illustration only and are never executed.
//!
//! # Usage
//!
//! 1. **Extraction** ([`extract_code_blocks`]): finds `run_` fenced blocks in
//!    model text, in order, with the line each fence starts on.
//! 2. **Execution** ([`CodeRunner`]): spawns the interpreter for the block's
//!    language with the source as a single script argument, captures stdout and
//!    stderr, and kills the whole process group when the timeout elapses or the
//!    caller cancels.
//!
//! There is no isolation boundary here: code runs with the user's full
//! environment and privileges. The [`SafetyChecker`] exists as a hook and
//! reports every block as safe.

pub mod error;
mod extract;
mod language;
mod process;
mod python;
mod result;
mod runner;
mod safety;

pub use error::SandboxError;
pub use extract::{CodeBlock, extract_code_blocks};
pub use language::{CodeLanguage, InterpreterConfig};
pub use python::prepare_python_source;
pub use result::{ExecutionResult, Termination, format_feedback};
pub use runner::{CodeRunner, DEFAULT_CODE_TIMEOUT};
pub use safety::{SafetyChecker, SafetyReport};
