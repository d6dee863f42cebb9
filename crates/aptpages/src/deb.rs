//! Reading control metadata out of `.deb` files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use aptpages_process::ProcessCommand;
use serde::{Deserialize, Serialize};

/// The control fields aptpages cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

impl PackageMetadata {
    /// Pick the required fields out of a parsed control paragraph.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            match fields.get(key).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => bail!("control field {key} is missing"),
            }
        };
        Ok(Self {
            name: get("Package")?,
            version: get("Version")?,
            architecture: get("Architecture")?,
        })
    }
}

/// Reads package metadata from a package file.
pub trait PackageInspector {
    fn inspect(&self, package: &Path) -> Result<PackageMetadata>;
}

/// [`PackageInspector`] backed by `dpkg-deb --field`.
#[derive(Debug, Clone)]
pub struct DpkgDeb {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl DpkgDeb {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl PackageInspector for DpkgDeb {
    fn inspect(&self, package: &Path) -> Result<PackageMetadata> {
        if !package.is_file() {
            bail!("package file {} does not exist", package.display());
        }
        let out = ProcessCommand::new(&self.program)
            .arg("--field")
            .arg(package)
            .args(["Package", "Version", "Architecture"])
            .timeout(self.timeout)
            .run()?
            .check("dpkg-deb --field")?;
        let fields = parse_control(&out.stdout);
        PackageMetadata::from_fields(&fields)
            .with_context(|| format!("unreadable control data in {}", package.display()))
    }
}

/// Parse one RFC 822 style control paragraph.
///
/// Continuation lines (leading space or tab) are appended to the previous
/// field with a newline. A repeated field keeps its first value. Parsing
/// stops at the first blank line.
pub fn parse_control(text: &str) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(key) = &current
                && let Some(value) = fields.get_mut(key)
            {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                let key = key.trim().to_string();
                if fields.contains_key(&key) {
                    current = None;
                } else {
                    fields.insert(key.clone(), value.trim().to_string());
                    current = Some(key);
                }
            }
            _ => current = None,
        }
    }

    fields
}
