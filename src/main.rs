use anyhow::Result;
use clap::Parser;

use git_release::cli::orchestration::ReleaseRun;
use git_release::config;
use git_release::context::ReleaseContext;
use git_release::domain::VersionSpec;
use git_release::git::{Git2Repository, Repository};
use git_release::hooks::CommandStamper;
use git_release::interrupt::CancelFlag;
use git_release::lock::RepoLock;
use git_release::metadata::MetadataRewriter;
use git_release::ui;

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    version,
    about = "Stamp, commit and tag a release, then build its backmerge branch"
)]
struct Args {
    #[arg(id = "release_version", value_name = "VERSION", help = "Version to release, e.g. v1.2.3")]
    version: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    // Validate before touching the repository
    let version = VersionSpec::parse(&args.version)?;

    let cancel = CancelFlag::install()?;

    let repo = Git2Repository::open(".")?;
    let workdir = repo.workdir()?;
    let config = config::load_config(&workdir)?;

    let _lock = RepoLock::acquire(&repo.git_dir())?;

    let started_at = chrono::Utc::now().timestamp();
    let ctx = ReleaseContext::build(&repo, &config, version, started_at)?;

    let rewriter = MetadataRewriter::new(&config.metadata);
    let stamper = CommandStamper::new(config.docs.stamp_commands.clone(), &workdir);

    let release = ReleaseRun {
        repo: &repo,
        stamper: &stamper,
        rewriter: &rewriter,
        messages: &config.messages,
        cancel: &cancel,
    };

    let start = repo.head_oid()?;
    match release.execute(&ctx) {
        Ok(outcome) => {
            ui::display_release_summary(&ctx, &outcome);
            Ok(())
        }
        Err(e) => {
            if !e.is_precondition() && repository_changed(&repo, start) {
                ui::display_warning("The release stopped after the repository was modified");
                ui::display_failure_hint(&ctx);
            }
            Err(e.into())
        }
    }
}

/// Whether a failed run left commits or work tree edits behind
fn repository_changed(repo: &Git2Repository, start: git2::Oid) -> bool {
    let moved = repo.head_oid().map(|head| head != start).unwrap_or(true);
    moved || !repo.is_worktree_clean().unwrap_or(false)
}
