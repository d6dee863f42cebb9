//! Commit messages for publishing commits.
//!
//! A publishing commit looks like this:
//!
//! ```text
//! [apt-action] Update apt repo
//!
//! apt-action-metadata{"format_version":1,"sw_version":"1.2.0","sw_architecture":"amd64","linux_version":"bullseye"}
//! ```
//!
//! The subject prefix lets [`crate::history`] skip unrelated commits cheaply;
//! the trailing metadata line is what it parses back.

use crate::fingerprint::Fingerprint;

/// Subject prefix of every commit aptpages creates.
pub const SUBJECT_PREFIX: &str = "[apt-action]";

/// Token immediately preceding the fingerprint JSON.
pub const METADATA_MARKER: &str = "apt-action-metadata";

pub const DEFAULT_SUMMARY: &str = "Update apt repo";

/// The exact message for the commit that publishes `fingerprint`.
///
/// `summary` is flattened to one line so the metadata always stays the last
/// line of the message.
pub fn commit_message(fingerprint: &Fingerprint, summary: &str) -> String {
    let summary = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    let summary = if summary.is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else {
        summary
    };
    format!(
        "{SUBJECT_PREFIX} {summary}\n\n{METADATA_MARKER}{}",
        fingerprint.canonical()
    )
}
