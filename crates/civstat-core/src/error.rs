// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error taxonomy shared by every statistical routine in the workspace.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StatError {
    /// Caller supplied data or parameters that violate a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The computation produced a non-finite or degenerate intermediate.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    /// The request is well-formed but outside what is implemented.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// A configured bound (iterations, search size) was exhausted.
    #[error("resource limit: {0}")]
    ResourceLimit(String),
}

impl StatError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }
}
