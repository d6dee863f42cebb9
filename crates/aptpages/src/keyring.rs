//! Signing keys: import, validation and signing through GnuPG.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use aptpages_process::ProcessCommand;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// `IMPORT_OK` reason bit: the key contains a private (secret) key.
pub const IMPORT_SECRET: u32 = 16;

/// One `IMPORT_OK` status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOk {
    /// Reason bit set (1 new key, 2 new uids, 4 new signatures, 8 new
    /// subkeys, 16 contains private key; 0 means unchanged).
    pub reason: u32,
    pub fingerprint: String,
}

impl ImportOk {
    pub fn contains_secret(&self) -> bool {
        self.reason & IMPORT_SECRET != 0
    }
}

/// Outcome of importing one armored key block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Number of keys processed (first field of `IMPORT_RES`).
    pub count: u32,
    pub secret_read: u32,
    pub secret_imported: u32,
    /// Secret keys that were already in the keyring.
    pub secret_unchanged: u32,
    pub imports: Vec<ImportOk>,
}

impl ImportResult {
    /// Fingerprint of the first imported secret key.
    pub fn secret_fingerprint(&self) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.contains_secret())
            .map(|i| i.fingerprint.as_str())
    }
}

/// Parse `gpg --status-fd` output of an import.
///
/// Returns `None` when gpg never reported an `IMPORT_RES` summary.
pub fn parse_import_status(status: &str) -> Option<ImportResult> {
    let mut result = ImportResult::default();
    let mut summarized = false;

    for line in status.lines() {
        let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        match parts.next() {
            Some("IMPORT_OK") => {
                let reason = parts.next().and_then(|r| r.parse().ok());
                let fingerprint = parts.next();
                if let (Some(reason), Some(fingerprint)) = (reason, fingerprint) {
                    result.imports.push(ImportOk {
                        reason,
                        fingerprint: fingerprint.to_string(),
                    });
                }
            }
            Some("IMPORT_RES") => {
                let counts: Vec<u32> = parts.map(|p| p.parse().unwrap_or(0)).collect();
                let at = |i: usize| counts.get(i).copied().unwrap_or(0);
                result.count = at(0);
                result.secret_read = at(9);
                result.secret_imported = at(10);
                result.secret_unchanged = at(11);
                summarized = true;
            }
            _ => {}
        }
    }

    summarized.then_some(result)
}

/// Accept a public key import only if exactly one key came in.
pub fn validate_public_import(result: &ImportResult) -> Result<(), PublishError> {
    if result.count != 1 {
        return Err(PublishError::Key(format!(
            "invalid public key provided, please provide 1 valid key (got {})",
            result.count
        )));
    }
    Ok(())
}

/// Accept a private key import only if exactly one key came in and it
/// carries secret material that ended up in the keyring. Returns the key
/// fingerprint to sign with.
pub fn validate_private_import(result: &ImportResult) -> Result<String, PublishError> {
    if result.count != 1 {
        return Err(PublishError::Key(format!(
            "invalid private key provided, please provide 1 valid key (got {})",
            result.count
        )));
    }
    let fingerprint = result
        .secret_fingerprint()
        .ok_or_else(|| PublishError::Key("key provided is not a secret key".to_string()))?;
    if result.secret_imported.saturating_add(result.secret_unchanged) == 0 {
        return Err(PublishError::Key(format!(
            "secret key {fingerprint} was not imported ({} read)",
            result.secret_read
        )));
    }
    Ok(fingerprint.to_string())
}

/// Key management and signing.
pub trait KeyService {
    /// Import an armored key block into the keyring.
    fn import(&mut self, armored: &str) -> Result<ImportResult>;

    /// Detached, armored signature of `data` made with `key_id`.
    ///
    /// Also leaves the passphrase cached in the agent so the indexing tool
    /// can sign repository metadata without prompting.
    fn sign(&mut self, key_id: &str, passphrase: Option<&str>, data: &[u8]) -> Result<Vec<u8>>;
}

/// [`KeyService`] backed by the `gpg` binary.
#[derive(Debug, Clone)]
pub struct GpgKeyring {
    program: PathBuf,
    home: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GpgKeyring {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            home: None,
            timeout: None,
        }
    }

    /// Use a specific `GNUPGHOME` instead of gpg's default.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.program).timeout(self.timeout);
        if let Some(home) = &self.home {
            cmd = cmd.arg("--homedir").arg(home);
        }
        cmd.arg("--batch")
    }
}

impl KeyService for GpgKeyring {
    fn import(&mut self, armored: &str) -> Result<ImportResult> {
        let out = self
            .command()
            .args(["--status-fd", "1", "--import"])
            .stdin(armored)
            .run()?;

        // gpg exits non-zero for partially bad input but still reports what
        // it imported; the caller validates the counts.
        match parse_import_status(&out.stdout) {
            Some(result) => Ok(result),
            None => bail!("gpg --import failed: {}", out.stderr.trim()),
        }
    }

    fn sign(&mut self, key_id: &str, passphrase: Option<&str>, data: &[u8]) -> Result<Vec<u8>> {
        let mut payload = tempfile::NamedTempFile::new().context("failed to create temp file")?;
        payload
            .write_all(data)
            .context("failed to write data to sign")?;

        let out = self
            .command()
            .args([
                "--yes",
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
                "--local-user",
                key_id,
                "--armor",
                "--detach-sign",
                "--output",
                "-",
            ])
            .arg(payload.path())
            .stdin(format!("{}\n", passphrase.unwrap_or("")))
            .run()?
            .check("gpg --detach-sign")?;
        Ok(out.stdout.into_bytes())
    }
}
