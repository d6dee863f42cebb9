use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use aptpages_git::CheckoutKind;

use crate::annotate::commit_message;
use crate::config::{PackageSubmission, PublishConfig};
use crate::deb::{PackageInspector, PackageMetadata};
use crate::error::PublishError;
use crate::fingerprint::Fingerprint;
use crate::gate::{self, Decision, GateInput};
use crate::history::{HistoryScan, PublishHistory};
use crate::index::RepositoryIndex;
use crate::keyring::{self, KeyService};
use crate::layout;
use crate::types::{PackageOutcome, PackageReport, PublishReport, RunState};
use crate::vcs::VersionControl;

/// Payload signed once before exporting, so the agent holds the passphrase
/// when reprepro asks gpg to sign the index files.
const PASSPHRASE_PRIMER: &[u8] = b"test";

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
    fn debug(&mut self, _msg: &str) {}
}

/// The external programs a publish run drives.
pub struct Collaborators<'a> {
    pub vcs: &'a mut dyn VersionControl,
    pub keys: &'a mut dyn KeyService,
    pub index: &'a mut dyn RepositoryIndex,
    pub inspector: &'a dyn PackageInspector,
}

/// Tracks the run state and refuses anything but a forward step.
#[derive(Debug)]
pub struct Pipeline {
    state: RunState,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) -> Result<(), PublishError> {
        if !self.state.can_advance_to(next) {
            return Err(PublishError::State {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
        Ok(())
    }

    /// Move to [`RunState::Aborted`] unless the run already finished.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Aborted;
        }
    }
}

/// One package file after its metadata was read.
struct Submission<'a> {
    source: &'a PackageSubmission,
    meta: PackageMetadata,
    fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Publish,
    AlreadyPublished,
    Duplicate,
}

/// Publish every configured package that the hosting branch does not have
/// yet, then push once.
///
/// Packages whose fingerprint is already recorded in the branch history are
/// skipped; when all of them are, the run ends as [`RunState::Skipped`]
/// without committing or pushing.
pub fn run_publish(
    cfg: &PublishConfig,
    collab: Collaborators<'_>,
    reporter: &mut dyn Reporter,
) -> Result<PublishReport, PublishError> {
    let mut pipeline = Pipeline::new();
    match publish(cfg, collab, reporter, &mut pipeline) {
        Ok(report) => Ok(report),
        Err(err) => {
            let at = pipeline.state();
            pipeline.abort();
            reporter.error(&format!("publish aborted after {at}: {err}"));
            Err(err)
        }
    }
}

fn publish(
    cfg: &PublishConfig,
    collab: Collaborators<'_>,
    reporter: &mut dyn Reporter,
    pipeline: &mut Pipeline,
) -> Result<PublishReport, PublishError> {
    let Collaborators {
        vcs,
        keys,
        index,
        inspector,
    } = collab;

    let submissions = inspect_packages(cfg, inspector, reporter)?;

    reporter.info(&format!("checking out {}", vcs.describe_remote()));
    match vcs
        .checkout()
        .map_err(|e| PublishError::tool("git checkout", e))?
    {
        CheckoutKind::Cloned => {}
        CheckoutKind::Bootstrapped => reporter.warn(&format!(
            "branch {} does not exist on the remote yet; starting it",
            cfg.page_branch
        )),
    }
    pipeline.advance(RunState::Cloned)?;

    let history = PublishHistory::new(
        vcs.history()
            .map_err(|e| PublishError::tool("git log", e))?,
    );
    let scan = history.scan();
    reporter.debug(&format!(
        "history: {} commit(s), {} from automation, {} recorded package(s)",
        scan.commits,
        scan.automation_commits,
        scan.fingerprints.len()
    ));
    if scan.unreadable > 0 {
        reporter.debug(&format!(
            "{} automation commit(s) carry no readable fingerprint",
            scan.unreadable
        ));
    }

    let tip_subject = history.tip().map(|c| c.subject());
    let plans = plan_submissions(&submissions, &scan, tip_subject, reporter);

    let key_id = prepare_keys(cfg, vcs.workdir(), keys, reporter)?;
    pipeline.advance(RunState::KeyReady)?;

    let repo_dir = vcs.workdir().join(&cfg.repo_folder);
    let distributions = layout::render_distributions(
        &cfg.repository,
        &cfg.distributions,
        &cfg.architectures,
        &key_id,
    );
    let conf = layout::write_distributions(&repo_dir, &distributions)?;
    reporter.debug(&format!("wrote {}", conf.display()));
    pipeline.advance(RunState::RepoPrepared)?;

    if !plans.contains(&Plan::Publish) {
        pipeline.advance(RunState::Skipped)?;
        reporter.info("every package is already published; nothing to do");
        return Ok(report(cfg, pipeline.state(), false, &submissions, &plans, &BTreeMap::new()));
    }

    pipeline.advance(RunState::Publishing)?;
    keys.sign(&key_id, cfg.passphrase(), PASSPHRASE_PRIMER)
        .map_err(|e| PublishError::tool("gpg sign", e))?;

    let mut commits = BTreeMap::new();
    for (i, sub) in submissions.iter().enumerate() {
        if plans[i] != Plan::Publish {
            continue;
        }
        let target = &sub.source.target;
        reporter.info(&format!(
            "{}: adding {} to {}",
            sub.meta.name,
            sub.fingerprint.package_version,
            target
        ));
        index
            .insert(target, &sub.meta.architecture, &sub.source.file)
            .map_err(|e| PublishError::tool("reprepro includedeb", e))?;
        index
            .export()
            .map_err(|e| PublishError::tool("reprepro export", e))?;

        let message = commit_message(&sub.fingerprint, &cfg.commit_summary);
        let commit = vcs
            .commit(&message)
            .map_err(|e| PublishError::tool("git commit", e))?;
        reporter.info(&format!("{}: committed {}", sub.meta.name, short(&commit)));
        commits.insert(i, commit);
    }
    pipeline.advance(RunState::Committed)?;

    vcs.push().map_err(|e| PublishError::tool("git push", e))?;
    pipeline.advance(RunState::Pushed)?;
    reporter.info(&format!("pushed {} commit(s) to {}", commits.len(), cfg.page_branch));

    pipeline.advance(RunState::Done)?;
    Ok(report(cfg, pipeline.state(), true, &submissions, &plans, &commits))
}

fn inspect_packages<'a>(
    cfg: &'a PublishConfig,
    inspector: &dyn PackageInspector,
    reporter: &mut dyn Reporter,
) -> Result<Vec<Submission<'a>>, PublishError> {
    cfg.packages
        .iter()
        .map(|source| {
            let meta = inspector.inspect(&source.file).map_err(|e| {
                PublishError::Config(format!(
                    "cannot read package {}: {e:#}",
                    source.file.display()
                ))
            })?;
            let fingerprint = Fingerprint::for_package(&meta, &source.target)?;
            reporter.debug(&format!(
                "{}: {} {}",
                source.file.display(),
                meta.name,
                fingerprint
            ));
            Ok(Submission {
                source,
                meta,
                fingerprint,
            })
        })
        .collect()
}

fn plan_submissions(
    submissions: &[Submission<'_>],
    scan: &HistoryScan,
    tip_subject: Option<&str>,
    reporter: &mut dyn Reporter,
) -> Vec<Plan> {
    let mut seen = BTreeSet::new();
    submissions
        .iter()
        .map(|sub| {
            if !seen.insert(&sub.fingerprint) {
                reporter.warn(&format!(
                    "{}: same package and target as an earlier file; ignoring",
                    sub.source.file.display()
                ));
                return Plan::Duplicate;
            }
            let input = GateInput {
                current: &sub.fingerprint,
                recorded: &scan.fingerprints,
                tip_subject,
            };
            if input.tip_is_automation() {
                reporter.debug("branch tip was written by a previous publish");
            }
            match gate::decide(&input) {
                Decision::Proceed => Plan::Publish,
                Decision::SkipNoop => {
                    reporter.info(&format!(
                        "{}: {} already published; skipping",
                        sub.meta.name, sub.fingerprint
                    ));
                    Plan::AlreadyPublished
                }
            }
        })
        .collect()
}

/// Import and validate both keys. Returns the signing key fingerprint.
fn prepare_keys(
    cfg: &PublishConfig,
    workdir: &Path,
    keys: &mut dyn KeyService,
    reporter: &mut dyn Reporter,
) -> Result<String, PublishError> {
    if layout::public_key_path(workdir).is_file() {
        reporter.debug("branch already has a public key");
    } else {
        let public = cfg.public_key.as_ref().ok_or_else(|| {
            PublishError::Key(format!(
                "branch has no {}; a public key is required for the first publish",
                layout::PUBLIC_KEY_FILE
            ))
        })?;
        let imported = keys
            .import(public.expose())
            .map_err(|e| PublishError::tool("gpg import", e))?;
        keyring::validate_public_import(&imported)?;
        layout::write_public_key(workdir, public.expose())?;
        reporter.info(&format!("added {}", layout::PUBLIC_KEY_FILE));
    }

    let imported = keys
        .import(cfg.private_key.expose())
        .map_err(|e| PublishError::tool("gpg import", e))?;
    let key_id = keyring::validate_private_import(&imported)?;
    reporter.info(&format!("signing key {key_id}"));
    Ok(key_id)
}

fn report(
    cfg: &PublishConfig,
    state: RunState,
    pushed: bool,
    submissions: &[Submission<'_>],
    plans: &[Plan],
    commits: &BTreeMap<usize, String>,
) -> PublishReport {
    let packages = submissions
        .iter()
        .zip(plans)
        .enumerate()
        .map(|(i, (sub, plan))| PackageReport {
            file: sub.source.file.clone(),
            package: sub.meta.name.clone(),
            fingerprint: sub.fingerprint.clone(),
            outcome: match plan {
                Plan::Publish => PackageOutcome::Published {
                    commit: commits.get(&i).cloned().unwrap_or_default(),
                },
                Plan::AlreadyPublished => PackageOutcome::AlreadyPublished,
                Plan::Duplicate => PackageOutcome::Duplicate,
            },
        })
        .collect();
    PublishReport {
        state,
        branch: cfg.page_branch.clone(),
        pushed,
        packages,
    }
}

/// Scan the history of an existing working copy without changing it.
pub fn recorded_fingerprints(vcs: &dyn VersionControl) -> Result<HistoryScan, PublishError> {
    let records = vcs
        .history()
        .map_err(|e| PublishError::tool("git log", e))?;
    Ok(PublishHistory::new(records).scan())
}

fn short(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
