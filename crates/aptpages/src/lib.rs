//! # aptpages
//!
//! Publishes Debian packages into a signed APT repository that lives on a
//! git hosting branch (usually `gh-pages`), and makes re-running the same
//! publish a no-op.
//!
//! Every publishing commit carries a fingerprint of what it published in a
//! trailer at the end of its message. Before touching anything, a run reads
//! the branch history back, collects those fingerprints, and only publishes
//! packages that are not recorded yet. Repeated CI triggers therefore never
//! stack duplicate commits or duplicate repository entries.
//!
//! ## Pipeline
//!
//! 1. Read control metadata of each package ([`deb`]) and build its
//!    [`fingerprint::Fingerprint`].
//! 2. Check out the hosting branch ([`vcs`]) and scan its log ([`history`]).
//! 3. Decide per package whether to proceed ([`gate`]).
//! 4. Import and validate the keys ([`keyring`]), write `conf/distributions`
//!    ([`layout`]).
//! 5. For each new package: insert, export ([`index`]), commit with an
//!    annotated message ([`annotate`]). Push once.
//!
//! [`engine::run_publish`] drives the steps through the
//! [`types::RunState`] state machine.
//!
//! ## Example
//!
//! ```ignore
//! use aptpages::{config, engine, deb, index, keyring, vcs};
//!
//! let cfg = config::PublishConfig::from_inputs(inputs)?;
//! let report = engine::run_publish(&cfg, collaborators, &mut reporter)?;
//! println!("{:?}", report.state);
//! ```

/// Commit messages that embed a fingerprint.
pub mod annotate;

/// Action inputs and their validation.
pub mod config;

/// Package control metadata via `dpkg-deb`.
pub mod deb;

/// Orchestration of a publish run.
pub mod engine;

/// Failure taxonomy and exit codes.
pub mod error;

/// Canonical identity of a publish request.
pub mod fingerprint;

/// Proceed-or-skip decision.
pub mod gate;

/// Reading recorded fingerprints from the branch log.
pub mod history;

/// Repository index maintenance via `reprepro`.
pub mod index;

/// Key import, validation and signing via `gpg`.
pub mod keyring;

/// Files aptpages writes on the hosting branch.
pub mod layout;

/// Run state and report types.
pub mod types;

/// The hosting branch behind a trait.
pub mod vcs;

pub use error::PublishError;
