//! Revision history for vault files, read from `git log`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Date layout printed by `git log` once the trailing UTC offset is removed
const GIT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Pins the `Date:` header regardless of the user's `log.date` setting
const GIT_DATE_ARG: &str = "--date=format:%a %b %d %H:%M:%S %Y %z";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Revision {hash} has no date")]
    MissingDate { hash: String },

    #[error("Malformed revision date '{date}': {source}")]
    MalformedDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One commit touching a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub hash: String,
    pub author: String,
    /// Raw date header, e.g. `Mon Jan 2 15:04:05 2023 +0800`
    pub date: String,
    /// First line of the commit message
    pub title: String,
    /// Remaining message lines, leading blank line stripped
    pub body: String,
}

impl Revision {
    /// Wall-clock time of the commit in the committer's own zone
    pub fn timestamp(&self) -> Result<NaiveDateTime, HistoryError> {
        let raw = self.date.trim();
        if raw.is_empty() {
            return Err(HistoryError::MissingDate {
                hash: self.hash.clone(),
            });
        }

        let mut fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.len() > 1 {
            fields.pop();
        }

        NaiveDateTime::parse_from_str(&fields.join(" "), GIT_DATE_FORMAT).map_err(|source| {
            HistoryError::MalformedDate {
                date: raw.to_string(),
                source,
            }
        })
    }
}

/// Anything able to list the revisions of a file, newest first.
///
/// Retrieval failures are reported as an empty history.
pub trait HistorySource {
    fn history_of(&self, path: &Path) -> Vec<Revision>;
}

/// History read by running `git log` inside the vault repository
#[derive(Debug, Clone)]
pub struct GitHistory {
    repo_root: PathBuf,
}

impl GitHistory {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }
}

impl HistorySource for GitHistory {
    fn history_of(&self, path: &Path) -> Vec<Revision> {
        fetch_history(&self.repo_root, path)
    }
}

/// Used when history lookups are disabled; every file has no revisions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistorySource for NoHistory {
    fn history_of(&self, _path: &Path) -> Vec<Revision> {
        Vec::new()
    }
}

/// Fixed histories keyed by file path
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    revisions: HashMap<PathBuf, Vec<Revision>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register revisions (newest first) for a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, revisions: Vec<Revision>) {
        self.revisions.insert(path.into(), revisions);
    }
}

impl HistorySource for MemoryHistory {
    fn history_of(&self, path: &Path) -> Vec<Revision> {
        self.revisions.get(path).cloned().unwrap_or_default()
    }
}

/// Run `git log -- <file>` in `repo_root` and parse its output.
///
/// The log layout and date format are pinned so user configuration such as
/// `log.date` or `format.pretty` cannot change what [`parse_log`] sees.
pub fn fetch_history(repo_root: &Path, file_path: &Path) -> Vec<Revision> {
    let relative = file_path.strip_prefix(repo_root).unwrap_or(file_path);
    let output = match Command::new("git")
        .arg("log")
        .arg("--no-color")
        .arg("--pretty=medium")
        .arg(GIT_DATE_ARG)
        .arg("--")
        .arg(relative)
        .current_dir(repo_root)
        .env("LC_ALL", "C")
        .output()
    {
        Ok(output) => output,
        Err(err) => {
            tracing::debug!("Failed to run git log for {:?}: {}", file_path, err);
            return Vec::new();
        }
    };

    if !output.status.success() {
        tracing::debug!(
            "git log failed for {:?}: {}",
            file_path,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Vec::new();
    }

    parse_log(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the default `git log` text format.
///
/// Unindented `commit <hash>` lines start a record, other unindented
/// `Key: value` lines are headers and indented lines form the message.
pub fn parse_log(text: &str) -> Vec<Revision> {
    let mut revisions = Vec::new();
    let mut current: Option<PendingRevision> = None;

    for line in text.lines() {
        if line.starts_with(' ') {
            if let Some(pending) = current.as_mut() {
                let stripped = line.strip_prefix("    ").unwrap_or(line);
                pending.message.push(stripped.to_string());
            }
            continue;
        }

        if let Some(hash) = line.strip_prefix("commit ") {
            if let Some(done) = current.take() {
                revisions.push(done.finish());
            }
            current = Some(PendingRevision::new(hash.trim()));
            continue;
        }

        if let (Some(pending), Some((key, value))) = (current.as_mut(), line.split_once(':')) {
            match key.trim().to_lowercase().as_str() {
                "author" => pending.revision.author = value.trim().to_string(),
                "date" => pending.revision.date = value.trim().to_string(),
                _ => {}
            }
        }
    }

    if let Some(done) = current.take() {
        revisions.push(done.finish());
    }

    revisions
}

struct PendingRevision {
    revision: Revision,
    message: Vec<String>,
}

impl PendingRevision {
    fn new(hash: &str) -> Self {
        Self {
            revision: Revision {
                hash: hash.to_string(),
                ..Revision::default()
            },
            message: Vec::new(),
        }
    }

    fn finish(self) -> Revision {
        let mut lines = self.message.into_iter();
        let title = lines.next().unwrap_or_default();
        let mut body: Vec<String> = lines.collect();
        if body.first().is_some_and(|l| l.is_empty()) {
            body.remove(0);
        }

        Revision {
            title,
            body: body.join("\n"),
            ..self.revision
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LOG: &str = concat!(
        "commit 9f2c1e0b7d\n",
        "Author: Ada <ada@example.com>\n",
        "Date:   Tue Oct 10 21:04:05 2023 +0800\n",
        "\n",
        "    Rework notes on ownership\n",
        "    \n",
        "    Split the borrowing section.\n",
        "    Added examples.\n",
        "\n",
        "commit 1a2b3c4d5e\n",
        "Merge: 111 222\n",
        "Author: Ada <ada@example.com>\n",
        "Date:   Mon Jan 2 15:04:05 2023 -0500\n",
        "\n",
        "    Initial import\n",
    );

    #[test]
    fn test_parse_log_records() {
        let revisions = parse_log(LOG);
        assert_eq!(revisions.len(), 2);

        let newest = &revisions[0];
        assert_eq!(newest.hash, "9f2c1e0b7d");
        assert_eq!(newest.author, "Ada <ada@example.com>");
        assert_eq!(newest.date, "Tue Oct 10 21:04:05 2023 +0800");
        assert_eq!(newest.title, "Rework notes on ownership");
        assert_eq!(newest.body, "Split the borrowing section.\nAdded examples.");

        let oldest = &revisions[1];
        assert_eq!(oldest.hash, "1a2b3c4d5e");
        assert_eq!(oldest.title, "Initial import");
        assert_eq!(oldest.body, "");
    }

    #[test]
    fn test_parse_empty_log() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("\n\n").is_empty());
    }

    #[test]
    fn test_timestamp_drops_offset() {
        let revisions = parse_log(LOG);
        assert_eq!(
            revisions[0].timestamp().unwrap(),
            NaiveDate::from_ymd_opt(2023, 10, 10)
                .unwrap()
                .and_hms_opt(21, 4, 5)
                .unwrap()
        );
        assert_eq!(
            revisions[1].timestamp().unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(15, 4, 5)
                .unwrap()
        );
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        let revision = Revision {
            hash: "abc".into(),
            date: "yesterday-ish +0000".into(),
            ..Revision::default()
        };
        assert!(matches!(
            revision.timestamp(),
            Err(HistoryError::MalformedDate { .. })
        ));

        let undated = Revision {
            hash: "abc".into(),
            ..Revision::default()
        };
        assert!(matches!(
            undated.timestamp(),
            Err(HistoryError::MissingDate { .. })
        ));
    }

    #[test]
    fn test_git_outside_repository_yields_no_history() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.md");
        std::fs::write(&file, "#share\nbody").unwrap();

        assert!(GitHistory::new(dir.path()).history_of(&file).is_empty());
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_DATE", "2023-01-02T15:04:05+0800")
            .env("GIT_COMMITTER_DATE", "2023-01-02T15:04:05+0800")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[test]
    fn test_git_history_ignores_log_date_setting() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        if !git(repo, &["init", "-q"]) {
            return;
        }
        assert!(git(repo, &["config", "log.date", "iso"]));
        assert!(git(repo, &["config", "format.pretty", "oneline"]));

        let file = repo.join("note.md");
        std::fs::write(&file, "#share\nbody").unwrap();
        assert!(git(repo, &["add", "note.md"]));
        assert!(git(
            repo,
            &[
                "-c",
                "user.name=Ada",
                "-c",
                "user.email=ada@example.com",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "-q",
                "-m",
                "Add note",
            ],
        ));

        let revisions = GitHistory::new(repo).history_of(&file);
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].title, "Add note");
        assert_eq!(
            revisions[0].timestamp().unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(15, 4, 5)
                .unwrap()
        );
    }

    #[test]
    fn test_memory_history_lookup() {
        let mut history = MemoryHistory::new();
        history.insert(
            "/vault/a.md",
            vec![Revision {
                hash: "h".into(),
                ..Revision::default()
            }],
        );
        assert_eq!(history.history_of(Path::new("/vault/a.md")).len(), 1);
        assert!(history.history_of(Path::new("/vault/b.md")).is_empty());
        assert!(NoHistory.history_of(Path::new("/vault/a.md")).is_empty());
    }
}
