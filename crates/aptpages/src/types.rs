use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Stage of a publish run. Runs only move forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Cloned,
    KeyReady,
    RepoPrepared,
    /// Every submission was already published. Terminal, successful.
    Skipped,
    Publishing,
    Committed,
    Pushed,
    Done,
    Aborted,
}

impl RunState {
    /// Whether `next` directly follows `self`.
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;

        if next == Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Init, Cloned)
                | (Cloned, KeyReady)
                | (KeyReady, RepoPrepared)
                | (RepoPrepared, Skipped)
                | (RepoPrepared, Publishing)
                | (Publishing, Committed)
                | (Committed, Pushed)
                | (Pushed, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Skipped | RunState::Done | RunState::Aborted)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Cloned => "cloned",
            RunState::KeyReady => "key_ready",
            RunState::RepoPrepared => "repo_prepared",
            RunState::Skipped => "skipped",
            RunState::Publishing => "publishing",
            RunState::Committed => "committed",
            RunState::Pushed => "pushed",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What happened to one package file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PackageOutcome {
    /// Inserted and committed; `commit` is the new commit id.
    Published { commit: String },
    /// Already recorded on the hosting branch.
    AlreadyPublished,
    /// Same fingerprint as an earlier file in this run.
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageReport {
    pub file: PathBuf,
    pub package: String,
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub outcome: PackageOutcome,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub state: RunState,
    pub branch: String,
    pub pushed: bool,
    pub packages: Vec<PackageReport>,
}

impl PublishReport {
    pub fn published(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages
            .iter()
            .filter(|p| matches!(p.outcome, PackageOutcome::Published { .. }))
    }
}
