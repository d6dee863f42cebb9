//! Repository index maintenance through reprepro.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use aptpages_process::ProcessCommand;

/// Inserts packages into the on-disk repository and regenerates its
/// signed metadata. Both operations must report failure.
pub trait RepositoryIndex {
    fn insert(&mut self, distribution: &str, architecture: &str, package: &Path) -> Result<()>;
    fn export(&mut self) -> Result<()>;
}

/// [`RepositoryIndex`] backed by the `reprepro` binary.
#[derive(Debug, Clone)]
pub struct Reprepro {
    program: PathBuf,
    base_dir: PathBuf,
    timeout: Option<Duration>,
}

impl Reprepro {
    pub fn new(program: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_dir: base_dir.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> ProcessCommand {
        ProcessCommand::new(&self.program)
            .arg("-b")
            .arg(&self.base_dir)
            .timeout(self.timeout)
    }
}

impl RepositoryIndex for Reprepro {
    fn insert(&mut self, distribution: &str, architecture: &str, package: &Path) -> Result<()> {
        let mut cmd = self.command().arg("--export=silent-never");
        // `all` packages go into every configured architecture.
        if architecture != "all" {
            cmd = cmd.args(["-A", architecture]);
        }
        cmd.args(["includedeb", distribution])
            .arg(package)
            .run()?
            .check("reprepro includedeb")?;
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        self.command()
            .arg("export")
            .run()?
            .check("reprepro export")?;
        Ok(())
    }
}
