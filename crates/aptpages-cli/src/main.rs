use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use aptpages::PublishError;
use aptpages::config::{PublishConfig, PublishInputs, ToolPaths};
use aptpages::deb::DpkgDeb;
use aptpages::engine::{self, Collaborators, Reporter};
use aptpages::index::Reprepro;
use aptpages::keyring::GpgKeyring;
use aptpages::types::{PackageOutcome, PublishReport};
use aptpages::vcs::GitHosting;
use aptpages_git::GitBranch;

#[derive(Parser, Debug)]
#[command(name = "aptpages", version)]
#[command(about = "Publish .deb packages into a signed APT repository on a gh-pages branch, safe to re-run")]
struct Cli {
    /// Verbose logging (RUST_LOG overrides).
    #[arg(
        long,
        global = true,
        env = "INPUT_DEBUG",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    debug: bool,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add the configured packages to the repository and push the branch.
    Publish(PublishArgs),
    /// Check that the external tools are installed.
    Doctor(ToolArgs),
    /// List the packages recorded in a local working copy of the branch.
    History {
        /// Working copy of the hosting branch.
        #[arg(long, default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        tools: ToolArgs,
    },
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Token used to push to the hosting repository.
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Hosting repository as owner/name.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Base URL of the git server.
    #[arg(long, env = "GITHUB_SERVER_URL")]
    server_url: Option<String>,

    /// Clone URL to use instead of one derived from server url and token.
    #[arg(long, env = "APTPAGES_REMOTE_URL", hide_env_values = true)]
    remote_url: Option<String>,

    /// Supported architectures, one per line.
    #[arg(long, env = "INPUT_ARCH")]
    architectures: Option<String>,

    /// Supported distribution codenames, one per line.
    #[arg(long, env = "INPUT_VERSION")]
    distributions: Option<String>,

    /// Package files to publish, one per line.
    #[arg(long, env = "INPUT_FILE")]
    files: Option<String>,

    /// Target distribution of each package file, one per line.
    #[arg(long, env = "INPUT_FILE_TARGET_VERSION")]
    file_targets: Option<String>,

    /// Branch that hosts the repository (default: gh-pages).
    #[arg(long, env = "INPUT_PAGE_BRANCH")]
    page_branch: Option<String>,

    /// Folder inside the branch that holds the repository (default: repo).
    #[arg(long, env = "INPUT_REPO_FOLDER")]
    repo_folder: Option<String>,

    /// Armored public key; needed only until the branch has public.key.
    #[arg(long, env = "INPUT_PUBLIC_KEY", hide_env_values = true)]
    public_key: Option<String>,

    /// Armored private signing key.
    #[arg(long, env = "INPUT_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Passphrase of the private key.
    #[arg(long, env = "INPUT_KEY_SECRET", hide_env_values = true)]
    key_secret: Option<String>,

    /// Where to check out the branch (default: repository name in the current directory).
    #[arg(long, env = "APTPAGES_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Subject line of publishing commits, after the [apt-action] prefix.
    #[arg(long, env = "APTPAGES_COMMIT_SUMMARY")]
    commit_summary: Option<String>,

    /// Limit for each external command (e.g. 5m). No limit by default.
    #[arg(long, env = "APTPAGES_COMMAND_TIMEOUT", value_parser = humantime::parse_duration)]
    command_timeout: Option<Duration>,

    /// GnuPG home directory (default: gpg's own).
    #[arg(long, env = "GNUPGHOME")]
    gnupg_home: Option<PathBuf>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args, Debug)]
struct ToolArgs {
    #[arg(long, env = "APTPAGES_GIT_BIN", default_value = "git")]
    git_bin: PathBuf,

    #[arg(long, env = "APTPAGES_GPG_BIN", default_value = "gpg")]
    gpg_bin: PathBuf,

    #[arg(long, env = "APTPAGES_REPREPRO_BIN", default_value = "reprepro")]
    reprepro_bin: PathBuf,

    #[arg(long, env = "APTPAGES_DPKG_DEB_BIN", default_value = "dpkg-deb")]
    dpkg_deb_bin: PathBuf,
}

impl From<ToolArgs> for ToolPaths {
    fn from(args: ToolArgs) -> Self {
        Self {
            git: args.git_bin,
            gpg: args.gpg_bin,
            reprepro: args.reprepro_bin,
            dpkg_deb: args.dpkg_deb_bin,
        }
    }
}

impl From<PublishArgs> for PublishInputs {
    fn from(args: PublishArgs) -> Self {
        Self {
            github_token: args.github_token,
            repository: args.repository,
            server_url: args.server_url,
            remote_url: args.remote_url,
            architectures: args.architectures,
            distributions: args.distributions,
            files: args.files,
            file_targets: args.file_targets,
            page_branch: args.page_branch,
            repo_folder: args.repo_folder,
            public_key: args.public_key,
            private_key: args.private_key,
            key_secret: args.key_secret,
            work_dir: args.work_dir,
            commit_summary: args.commit_summary,
            command_timeout: args.command_timeout,
            gnupg_home: args.gnupg_home,
            tools: args.tools.into(),
        }
    }
}

struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&mut self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warn(&mut self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&mut self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn debug(&mut self, msg: &str) {
        tracing::debug!("{msg}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            let code = err
                .downcast_ref::<PublishError>()
                .map(PublishError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Publish(args) => {
            let cfg = PublishConfig::from_inputs(args.into())?;
            let report = run_publish(&cfg)?;
            print_report(&report, cli.json)?;
        }
        Commands::Doctor(tools) => run_doctor(&tools.into())?,
        Commands::History { path, tools } => {
            let tools: ToolPaths = tools.into();
            run_history(&tools, path, cli.json)?;
        }
    }
    Ok(())
}

fn run_publish(cfg: &PublishConfig) -> Result<PublishReport, PublishError> {
    let timeout = cfg.command_timeout;
    let (name, email) = cfg.identity();
    let branch = GitBranch::new(
        cfg.tools.git.to_string_lossy(),
        cfg.remote_url().expose(),
        &cfg.page_branch,
        &cfg.work_dir,
    )
    .with_timeout(timeout);

    let mut vcs = GitHosting::new(branch, name, email);
    let mut keys = GpgKeyring::new(&cfg.tools.gpg)
        .with_home(cfg.gnupg_home.clone())
        .with_timeout(timeout);
    let mut index = Reprepro::new(&cfg.tools.reprepro, cfg.repo_dir()).with_timeout(timeout);
    let inspector = DpkgDeb::new(&cfg.tools.dpkg_deb).with_timeout(timeout);

    engine::run_publish(
        cfg,
        Collaborators {
            vcs: &mut vcs,
            keys: &mut keys,
            index: &mut index,
            inspector: &inspector,
        },
        &mut TracingReporter,
    )
}

fn print_report(report: &PublishReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for p in &report.packages {
        let outcome = match &p.outcome {
            PackageOutcome::Published { commit } => {
                format!("published ({})", commit.get(..7).unwrap_or(commit))
            }
            PackageOutcome::AlreadyPublished => "already published".to_string(),
            PackageOutcome::Duplicate => "duplicate, ignored".to_string(),
        };
        println!("{} {}: {outcome}", p.package, p.fingerprint);
    }
    println!("state: {}", report.state);
    println!("pushed: {}", report.pushed);
    Ok(())
}

fn run_doctor(tools: &ToolPaths) -> Result<()> {
    let mut missing = Vec::new();
    for (name, program) in [
        ("git", &tools.git),
        ("gpg", &tools.gpg),
        ("reprepro", &tools.reprepro),
        ("dpkg-deb", &tools.dpkg_deb),
    ] {
        let program = program.to_string_lossy();
        match aptpages_process::which(&program) {
            Some(path) => {
                let version = aptpages_process::program_version(&program)
                    .unwrap_or_else(|| "unknown version".to_string());
                println!("{name}: {} ({version})", path.display());
            }
            None => {
                println!("{name}: not found ({program})");
                missing.push(name);
            }
        }
    }

    if !missing.is_empty() {
        bail!("missing tools: {}", missing.join(", "));
    }
    Ok(())
}

fn run_history(tools: &ToolPaths, path: PathBuf, json: bool) -> Result<()> {
    let git = tools.git.to_string_lossy();
    if !aptpages_git::is_git_repo(&git, &path) {
        bail!("{} is not a git working copy", path.display());
    }

    let branch = GitBranch::new(git, "", "", path);
    let local = GitHosting::new(branch, "", "");
    let scan = engine::recorded_fingerprints(&local)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scan.fingerprints)?);
        return Ok(());
    }

    for fp in &scan.fingerprints {
        println!("{fp}");
    }
    println!(
        "commits: {}, automation: {}, unreadable: {}",
        scan.commits, scan.automation_commits, scan.unreadable
    );
    Ok(())
}
