//! The hosting branch as seen by the engine.

use std::path::Path;

use anyhow::Result;
use aptpages_git::{CheckoutKind, GitBranch};

use crate::history::CommitRecord;

/// Version-control operations the publish run needs.
pub trait VersionControl {
    /// Fresh working copy of the hosting branch. Replaces any existing one.
    fn checkout(&mut self) -> Result<CheckoutKind>;

    fn workdir(&self) -> &Path;

    /// Commits on the branch, newest first. Empty for an unborn branch.
    fn history(&self) -> Result<Vec<CommitRecord>>;

    /// Stage the whole tree and commit it with exactly `message`.
    /// Returns the new commit id.
    fn commit(&mut self, message: &str) -> Result<String>;

    fn push(&mut self) -> Result<()>;

    /// Remote location safe to print.
    fn describe_remote(&self) -> String;
}

/// [`VersionControl`] over a git remote.
#[derive(Debug, Clone)]
pub struct GitHosting {
    branch: GitBranch,
    identity: (String, String),
    identity_set: bool,
}

impl GitHosting {
    pub fn new(branch: GitBranch, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            branch,
            identity: (name.into(), email.into()),
            identity_set: false,
        }
    }
}

impl VersionControl for GitHosting {
    fn checkout(&mut self) -> Result<CheckoutKind> {
        self.identity_set = false;
        self.branch.checkout()
    }

    fn workdir(&self) -> &Path {
        self.branch.workdir()
    }

    fn history(&self) -> Result<Vec<CommitRecord>> {
        Ok(self
            .branch
            .log_entries()?
            .into_iter()
            .map(CommitRecord::from)
            .collect())
    }

    fn commit(&mut self, message: &str) -> Result<String> {
        if !self.identity_set {
            let (name, email) = &self.identity;
            self.branch.set_identity(name, email)?;
            self.identity_set = true;
        }
        self.branch.commit_all(message)
    }

    fn push(&mut self) -> Result<()> {
        self.branch.push()
    }

    fn describe_remote(&self) -> String {
        format!("{} ({})", self.branch.display_remote(), self.branch.branch())
    }
}
