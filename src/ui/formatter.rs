//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from the
//! release pipeline. Functions that build text are pure and testable; the
//! `display_*` functions only print.

use console::style;

use crate::cli::orchestration::ReleaseOutcome;
use crate::context::ReleaseContext;
use crate::sequencer::short;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Format and print a warning in yellow.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

/// Commands the operator runs to publish the release.
///
/// The tool never pushes; these are printed at the end of a successful run.
pub fn push_commands(ctx: &ReleaseContext, outcome: &ReleaseOutcome) -> Vec<String> {
    let remote = &ctx.fetch_remote_name;
    vec![
        format!("git push {} {}", remote, ctx.original_branch),
        format!("git push {} {}", remote, outcome.tag.name),
        format!("git push {} {}", remote, outcome.backmerge_branch),
    ]
}

/// Display what the run created and how to publish it.
pub fn display_release_summary(ctx: &ReleaseContext, outcome: &ReleaseOutcome) {
    println!("\n{}", style(format!("Release {} prepared", ctx.version)).bold());
    println!("  Doc commit:      {}", short(outcome.doc_commit));
    println!("  Release commit:  {}", short(outcome.release_commit));
    println!(
        "  Tag:             {}",
        style(&outcome.tag.name).green()
    );
    println!("  Dev commit:      {}", short(outcome.dev_commit));
    println!("  Backmerge:       {}", outcome.backmerge_branch);

    println!(
        "\n{} Nothing was pushed. To publish to {}, run:",
        style("→").yellow(),
        ctx.push_url
    );
    for command in push_commands(ctx, outcome) {
        println!("  {}", style(command).cyan());
    }
    println!(
        "Then open a pull request from {} against {}.",
        outcome.backmerge_branch, ctx.mainline_branch
    );
}

/// Tell the operator which refs a failed run left behind.
pub fn display_failure_hint(ctx: &ReleaseContext) {
    eprintln!(
        "Commits already made on '{}' were kept. Inspect them with `git log`, and remove a \
         local tag {} or branches {} / {} before retrying.",
        ctx.original_branch,
        ctx.tag_name(),
        ctx.temp_branch_name,
        ctx.backmerge_branch_name
    );
}
