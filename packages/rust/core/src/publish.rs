//! Publishing the site through git.

use std::path::Path;
use std::process::{Command, Output};

use tracing::{info, instrument, warn};

use curation_shared::{CurationError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was made and pushed.
    Published,
    /// Nothing changed since the last commit; nothing was pushed.
    NothingToCommit,
}

/// Stage `files`, commit with `message`, and push, all inside `site_dir`.
///
/// Listed files that do not exist are skipped with a warning.
#[instrument(skip(files))]
pub fn publish(site_dir: &Path, files: &[String], message: &str) -> Result<PublishOutcome> {
    let present: Vec<&str> = files
        .iter()
        .map(String::as_str)
        .filter(|f| {
            let exists = site_dir.join(f).exists();
            if !exists {
                warn!(file = %f, "publish file missing, skipping");
            }
            exists
        })
        .collect();
    if present.is_empty() {
        return Err(CurationError::Publish("no files to publish".into()));
    }

    let mut add = vec!["add", "--"];
    add.extend(&present);
    check(git(site_dir, &add)?, "git add")?;

    let commit = git(site_dir, &["commit", "-m", message])?;
    if !commit.status.success() {
        if mentions_nothing_to_commit(&commit) {
            info!("nothing to commit");
            return Ok(PublishOutcome::NothingToCommit);
        }
        return Err(failure("git commit", &commit));
    }

    check(git(site_dir, &["push"])?, "git push")?;
    info!(files = present.len(), "site published");
    Ok(PublishOutcome::Published)
}

fn git(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| CurationError::Publish(format!("failed to run git: {e}")))
}

fn check(output: Output, step: &str) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(failure(step, &output))
    }
}

fn failure(step: &str, output: &Output) -> CurationError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() { stdout } else { stderr };
    CurationError::Publish(format!("{step} failed: {}", detail.trim()))
}

fn mentions_nothing_to_commit(output: &Output) -> bool {
    [&output.stdout, &output.stderr]
        .iter()
        .any(|stream| String::from_utf8_lossy(stream).contains("nothing to commit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn init_repo(dir: &Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Curation Test"],
            vec!["config", "user.email", "curation@example.com"],
            vec!["config", "commit.gpgsign", "false"],
        ] {
            assert!(git(dir, &args).unwrap().status.success());
        }
    }

    #[test]
    fn no_existing_files_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = publish(dir.path(), &["index.html".into()], "msg").unwrap_err();
        assert!(matches!(err, CurationError::Publish(_)));
    }

    #[test]
    fn unchanged_tree_is_nothing_to_commit() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(git(dir.path(), &["add", "index.html"]).unwrap().status.success());
        assert!(git(dir.path(), &["commit", "-q", "-m", "init"]).unwrap().status.success());

        let outcome = publish(dir.path(), &["index.html".into(), "missing.json".into()], "msg");
        assert_eq!(outcome.unwrap(), PublishOutcome::NothingToCommit);
    }

    #[test]
    fn push_without_remote_is_error() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("index.html"), "<html>new</html>").unwrap();

        let err = publish(dir.path(), &["index.html".into()], "Auto-update").unwrap_err();
        assert!(err.to_string().contains("git push"));

        // The commit itself landed.
        let log = git(dir.path(), &["log", "--oneline"]).unwrap();
        assert!(String::from_utf8_lossy(&log.stdout).contains("Auto-update"));
    }
}
