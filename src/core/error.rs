//! Error model shared by the query, range, build and indexing layers.
//!
//! Recovery policy:
//! - `ParseMalformed` and `RangeNotFound` are recovered where they occur
//!   (skip the line, degrade the range) and never reach the caller.
//! - `QueryFailed`, `FileNotFound` and `BuildStepFailed` are surfaced with
//!   the underlying message, but a hierarchy level still resolves to a list.

use std::path::PathBuf;

use miette::Diagnostic;

use crate::core::database::BuildStep;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum HierarchyError
{
    /// External process exited non-zero or wrote to stderr
    #[error("query `{command}` failed: {reason}")]
    #[diagnostic(
        code(callscope::query_failed),
        help("check that the databases exist and the tools in `callscope tools` resolve")
    )]
    QueryFailed
    {
        command: String,
        reason: String,
    },

    /// Unusable output line (blank, truncated, non-numeric line field)
    #[error("malformed index line: {line:?}")]
    #[diagnostic(code(callscope::parse_malformed))]
    ParseMalformed
    {
        line: String,
    },

    /// Token absent from the line the index pointed at
    #[error("`{token}` not found on line {} of {}", .line + 1, .file.display())]
    #[diagnostic(code(callscope::range_not_found))]
    RangeNotFound
    {
        file: PathBuf,
        line: usize,
        token: String,
    },

    /// Source text accessor could not open the file or line
    #[error("cannot read {}: {reason}", .path.display())]
    #[diagnostic(code(callscope::file_not_found))]
    FileNotFound
    {
        path: PathBuf,
        reason: String,
    },

    /// One of the two database builds failed
    #[error("{step} build failed: {reason}")]
    #[diagnostic(
        code(callscope::build_step_failed),
        help("run `callscope build` with CALLSCOPE_LOG=debug to see the tool invocation")
    )]
    BuildStepFailed
    {
        step: BuildStep,
        reason: String,
    },

    /// A build or re-index is already in flight
    #[error("{0} is already running")]
    #[diagnostic(code(callscope::busy))]
    Busy(&'static str),
}

impl HierarchyError
{
    /// True for errors that empty a whole hierarchy level.
    pub fn is_query_failure(&self) -> bool
    {
        matches!(self, HierarchyError::QueryFailed { .. })
    }
}
