//! Reading previous publishes back out of the hosting branch's log.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotate::{METADATA_MARKER, SUBJECT_PREFIX};
use crate::fingerprint::{FORMAT_VERSION, Fingerprint};

static TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{}(\{{[^\n]*\}})\s*\z",
        regex::escape(METADATA_MARKER)
    ))
    .expect("trailer regex is valid")
});

/// One commit on the hosting branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
}

impl CommitRecord {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Whether the commit carries the automation subject prefix.
    pub fn is_automation(&self) -> bool {
        self.message.starts_with(SUBJECT_PREFIX)
    }

    /// The recorded fingerprint, if this is an automation commit with a
    /// readable metadata trailer.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        if !self.is_automation() {
            return None;
        }
        extract_fingerprint(&self.message)
    }
}

/// Parse the metadata trailer at the end of a commit message.
///
/// Returns `None` for messages without a trailer, with malformed JSON, or
/// with a `format_version` other than [`FORMAT_VERSION`].
pub fn extract_fingerprint(message: &str) -> Option<Fingerprint> {
    let json = TRAILER.captures(message)?.get(1)?.as_str();
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    if value.get("format_version")?.as_u64()? != u64::from(FORMAT_VERSION) {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Commits of the hosting branch, newest first.
#[derive(Debug, Clone, Default)]
pub struct PublishHistory {
    records: Vec<CommitRecord>,
}

/// What a full pass over the history found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryScan {
    pub fingerprints: BTreeSet<Fingerprint>,
    pub commits: usize,
    pub automation_commits: usize,
    /// Automation commits without a readable fingerprint (older tooling,
    /// hand edits, or a newer encoding).
    pub unreadable: usize,
}

impl PublishHistory {
    pub fn new(records: Vec<CommitRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The most recent commit, if the branch has any.
    pub fn tip(&self) -> Option<&CommitRecord> {
        self.records.first()
    }

    /// Whether any commit records `fingerprint`. Stops at the first match.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.records
            .iter()
            .filter_map(CommitRecord::fingerprint)
            .any(|fp| &fp == fingerprint)
    }

    /// Collect every recorded fingerprint.
    pub fn scan(&self) -> HistoryScan {
        let mut scan = HistoryScan {
            commits: self.records.len(),
            ..HistoryScan::default()
        };
        for record in self.records.iter().filter(|r| r.is_automation()) {
            scan.automation_commits += 1;
            match extract_fingerprint(&record.message) {
                Some(fp) => {
                    scan.fingerprints.insert(fp);
                }
                None => scan.unreadable += 1,
            }
        }
        scan
    }
}

impl From<aptpages_git::LogEntry> for CommitRecord {
    fn from(entry: aptpages_git::LogEntry) -> Self {
        Self {
            id: entry.id,
            message: entry.message,
        }
    }
}
