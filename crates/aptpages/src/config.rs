//! Run configuration, built once from the action inputs.
//!
//! [`PublishInputs`] is the raw form: every value as it arrived from flags
//! or the environment, lists still newline separated. [`PublishConfig::from_inputs`]
//! splits, defaults and validates it; nothing downstream reads the
//! environment.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::annotate::DEFAULT_SUMMARY;
use crate::error::PublishError;

pub const DEFAULT_PAGE_BRANCH: &str = "gh-pages";
pub const DEFAULT_REPO_FOLDER: &str = "repo";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// A value that must never reach logs or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Locations of the external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub git: PathBuf,
    pub gpg: PathBuf,
    pub reprepro: PathBuf,
    pub dpkg_deb: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            gpg: PathBuf::from("gpg"),
            reprepro: PathBuf::from("reprepro"),
            dpkg_deb: PathBuf::from("dpkg-deb"),
        }
    }
}

/// One package file and the distribution it goes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSubmission {
    pub file: PathBuf,
    pub target: String,
}

/// Raw action inputs.
#[derive(Debug, Clone, Default)]
pub struct PublishInputs {
    pub github_token: Option<String>,
    pub repository: Option<String>,
    pub server_url: Option<String>,
    pub remote_url: Option<String>,
    pub architectures: Option<String>,
    pub distributions: Option<String>,
    pub files: Option<String>,
    pub file_targets: Option<String>,
    pub page_branch: Option<String>,
    pub repo_folder: Option<String>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub key_secret: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub commit_summary: Option<String>,
    pub command_timeout: Option<Duration>,
    pub gnupg_home: Option<PathBuf>,
    pub tools: ToolPaths,
}

/// Validated configuration of one publish run.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub github_token: Secret,
    /// `owner/name`.
    pub repository: String,
    pub server_url: String,
    /// Overrides the remote derived from server url, token and repository.
    pub remote_url: Option<Secret>,
    pub architectures: Vec<String>,
    /// Codenames the repository supports.
    pub distributions: Vec<String>,
    pub packages: Vec<PackageSubmission>,
    pub page_branch: String,
    pub repo_folder: PathBuf,
    pub public_key: Option<Secret>,
    pub private_key: Secret,
    pub key_secret: Option<Secret>,
    pub work_dir: PathBuf,
    pub commit_summary: String,
    pub command_timeout: Option<Duration>,
    pub gnupg_home: Option<PathBuf>,
    pub tools: ToolPaths,
}

/// Split a newline separated list. Entries are trimmed, blank lines dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn required(value: Option<String>, name: &str) -> Result<String, PublishError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PublishError::Config(format!("required input {name} is missing"))),
    }
}

fn required_list(value: Option<String>, name: &str) -> Result<Vec<String>, PublishError> {
    let list = split_list(&required(value, name)?);
    if list.is_empty() {
        return Err(PublishError::Config(format!("required input {name} is empty")));
    }
    Ok(list)
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PublishConfig {
    pub fn from_inputs(inputs: PublishInputs) -> Result<Self, PublishError> {
        let github_token = Secret::new(required(inputs.github_token, "github token")?.trim());
        let repository = required(inputs.repository, "repository")?.trim().to_string();
        let architectures = required_list(inputs.architectures, "architectures")?;
        let distributions = required_list(inputs.distributions, "distributions")?;
        let files = required_list(inputs.files, "package files")?;
        let targets = required_list(inputs.file_targets, "package file targets")?;
        let private_key = Secret::new(required(inputs.private_key, "private key")?);

        if files.len() != targets.len() {
            return Err(PublishError::Config(format!(
                "{} package file(s) but {} target distribution(s); give one target per file",
                files.len(),
                targets.len()
            )));
        }
        let packages = files
            .into_iter()
            .zip(targets)
            .map(|(file, target)| PackageSubmission {
                file: PathBuf::from(file),
                target,
            })
            .collect();

        let slug = repository
            .split_once('/')
            .map(|(_, name)| name.to_string())
            .unwrap_or_default();

        let cfg = Self {
            github_token,
            repository,
            server_url: optional(inputs.server_url)
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            remote_url: optional(inputs.remote_url).map(|s| Secret::new(s.trim())),
            architectures,
            distributions,
            packages,
            page_branch: optional(inputs.page_branch)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_PAGE_BRANCH.to_string()),
            repo_folder: PathBuf::from(
                optional(inputs.repo_folder)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_REPO_FOLDER.to_string()),
            ),
            public_key: optional(inputs.public_key).map(Secret::new),
            private_key,
            key_secret: inputs.key_secret.filter(|s| !s.is_empty()).map(Secret::new),
            work_dir: inputs.work_dir.unwrap_or_else(|| PathBuf::from(slug)),
            commit_summary: optional(inputs.commit_summary)
                .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            command_timeout: inputs.command_timeout,
            gnupg_home: inputs.gnupg_home,
            tools: inputs.tools,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PublishError> {
        let config = |msg: String| Err(PublishError::Config(msg));

        match self.repository.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => {
                return config(format!(
                    "repository must look like owner/name, got {:?}",
                    self.repository
                ));
            }
        }

        if self.architectures.is_empty() || self.distributions.is_empty() {
            return config("at least one architecture and one distribution are required".into());
        }
        if self.packages.is_empty() {
            return config("no package files given".into());
        }

        for package in &self.packages {
            if !self.distributions.contains(&package.target) {
                return config(format!(
                    "target distribution {} of {} is not in the supported list ({})",
                    package.target,
                    package.file.display(),
                    self.distributions.join(", ")
                ));
            }
        }

        if self.page_branch.trim().is_empty() {
            return config("page branch cannot be empty".into());
        }

        if !is_plain_relative(&self.repo_folder) {
            return config(format!(
                "repo folder must be a relative path inside the branch, got {}",
                self.repo_folder.display()
            ));
        }

        if self.remote_url.is_none()
            && !(self.server_url.starts_with("https://") || self.server_url.starts_with("http://"))
        {
            return config(format!(
                "server url must start with https:// or http://, got {}",
                self.server_url
            ));
        }

        Ok(())
    }

    /// Repository owner; also the commit author name.
    pub fn owner(&self) -> &str {
        self.repository
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.repository)
    }

    /// Commit identity `(name, email)` for publishing commits.
    pub fn identity(&self) -> (String, String) {
        let owner = self.owner();
        (
            owner.to_string(),
            format!("{owner}@users.noreply.github.com"),
        )
    }

    /// Authenticated clone URL of the hosting repository.
    pub fn remote_url(&self) -> Secret {
        if let Some(url) = &self.remote_url {
            return url.clone();
        }
        let (scheme, host) = self
            .server_url
            .split_once("://")
            .unwrap_or(("https", self.server_url.as_str()));
        Secret::new(format!(
            "{scheme}://{}@{host}/{}.git",
            self.github_token.expose(),
            self.repository
        ))
    }

    /// Repository tree managed by reprepro, inside the working copy.
    pub fn repo_dir(&self) -> PathBuf {
        self.work_dir.join(&self.repo_folder)
    }

    /// Passphrase for the signing key; empty when none was given.
    pub fn passphrase(&self) -> Option<&str> {
        self.key_secret.as_ref().map(Secret::expose)
    }
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
