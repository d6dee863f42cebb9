//! Failure taxonomy of a publish run.

use thiserror::Error;

use crate::types::RunState;

/// Why a publish run stopped. A duplicate request is not an error; it ends
/// the run as [`RunState::Skipped`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// Missing or inconsistent input, or unreadable package metadata.
    /// Raised before the hosting branch is touched.
    #[error("configuration error: {0}")]
    Config(String),

    /// Signing keys are missing, malformed, or not what was expected.
    #[error("key error: {0}")]
    Key(String),

    /// An external program (git, gpg, reprepro, dpkg-deb) failed.
    #[error("{step} failed: {message}")]
    Tool { step: String, message: String },

    #[error("i/o error while {action}: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    /// The orchestrator tried to move backwards or skip a stage.
    #[error("illegal state transition {from} -> {to}")]
    State { from: RunState, to: RunState },
}

impl PublishError {
    /// Wrap a collaborator failure, keeping its full context chain.
    pub fn tool(step: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Tool {
            step: step.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            action: action.into(),
            source,
        }
    }

    /// Process exit code for this failure. Success and skip exit with 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            PublishError::Config(_) => 2,
            PublishError::Key(_) => 3,
            PublishError::Tool { .. } => 4,
            PublishError::Io { .. } | PublishError::State { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_exits_non_zero() {
        let errors = [
            PublishError::Config("x".into()),
            PublishError::Key("x".into()),
            PublishError::tool("reprepro includedeb", anyhow::anyhow!("boom")),
            PublishError::io("writing", std::io::Error::other("disk")),
            PublishError::State {
                from: RunState::Pushed,
                to: RunState::Cloned,
            },
        ];
        for err in errors {
            assert_ne!(err.exit_code(), 0, "{err}");
        }
    }

    #[test]
    fn tool_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("exit code 254").context("reprepro failed");
        let err = PublishError::tool("insert package", inner);
        assert_eq!(
            err.to_string(),
            "insert package failed: reprepro failed: exit code 254"
        );
    }

    #[test]
    fn state_error_names_both_states() {
        let err = PublishError::State {
            from: RunState::Pushed,
            to: RunState::Cloned,
        };
        assert_eq!(err.to_string(), "illegal state transition pushed -> cloned");
    }
}
