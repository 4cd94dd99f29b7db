use super::{find_in_ancestors, read_to_string, start_dir, Detector, ProjectError, ProjectResult};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

const TRUNK: &str = "trunk";

#[derive(Debug, Clone)]
pub struct Subversion {
    pub filepath: PathBuf,
}

/// Repository location of a working copy.
#[derive(Debug, PartialEq)]
struct WorkingCopy {
    /// e.g. `https://svn.example.com/repos/wakatime-cli`
    root_url: String,
    /// Path of the checked out directory below `root_url`, e.g. `branches/billing`.
    relative_path: String,
}

impl Detector for Subversion {
    fn detect(&self) -> Result<Option<ProjectResult>, ProjectError> {
        let start = start_dir(&self.filepath)?;

        let svn_dir = match find_in_ancestors(&start, ".svn", fs::Metadata::is_dir) {
            Some(dir) => dir,
            None => return Ok(None),
        };

        let wc = read_working_copy(&svn_dir)?;

        let project = wc
            .root_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned();

        if project.is_empty() {
            return Err(ProjectError::Malformed {
                path: svn_dir,
                reason: format!("repository root {:?} has no name", wc.root_url),
            });
        }

        Ok(Some(ProjectResult {
            project,
            branch: branch_of(&wc.relative_path),
        }))
    }

    fn name(&self) -> &'static str {
        "svn-detector"
    }
}

/// Reads `wc.db` (svn 1.7 and later), falling back to the plain text
/// `entries` file older clients keep in every directory.
fn read_working_copy(svn_dir: &Path) -> Result<WorkingCopy, ProjectError> {
    let db = svn_dir.join("wc.db");
    if db.is_file() {
        return read_wc_db(&db);
    }

    let entries = svn_dir.join("entries");
    if entries.is_file() {
        return read_entries(&entries);
    }

    Err(ProjectError::Malformed {
        path: svn_dir.to_path_buf(),
        reason: "neither wc.db nor entries found".into(),
    })
}

fn read_wc_db(path: &Path) -> Result<WorkingCopy, ProjectError> {
    let db_error = |source| ProjectError::SvnDatabase {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(db_error)?;

    // The working copy root is the base layer node with an empty local path.
    let row = conn
        .query_row(
            "SELECT r.root, n.repos_path
             FROM nodes n JOIN repository r ON r.id = n.repos_id
             WHERE n.local_relpath = '' AND n.op_depth = 0
             LIMIT 1",
            [],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(db_error)?;

    match row {
        Some((root_url, relative_path)) => Ok(WorkingCopy {
            root_url,
            relative_path,
        }),
        None => Err(ProjectError::Malformed {
            path: path.to_path_buf(),
            reason: "no working copy root node".into(),
        }),
    }
}

// Pre-1.7 layout: format number, blank, kind, revision, url, repository root.
fn read_entries(path: &Path) -> Result<WorkingCopy, ProjectError> {
    let content = read_to_string(path)?;
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let (url, root_url) = match (lines.get(4), lines.get(5)) {
        (Some(url), Some(root)) if !url.is_empty() && !root.is_empty() => (*url, *root),
        _ => {
            return Err(ProjectError::Malformed {
                path: path.to_path_buf(),
                reason: "missing url or repository root".into(),
            })
        }
    };

    let relative_path = url
        .strip_prefix(root_url)
        .ok_or_else(|| ProjectError::Malformed {
            path: path.to_path_buf(),
            reason: format!("url {:?} is outside of repository root {:?}", url, root_url),
        })?
        .trim_start_matches('/')
        .to_owned();

    Ok(WorkingCopy {
        root_url: root_url.to_owned(),
        relative_path,
    })
}

/// `trunk/...` is trunk, `branches/<name>/...` and `tags/<name>/...` are
/// `<name>`. Anything else counts as trunk.
fn branch_of(relative_path: &str) -> String {
    let mut segments = relative_path.split('/').filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some("branches"), Some(name)) | (Some("tags"), Some(name)) => name.to_owned(),
        _ => TRUNK.to_owned(),
    }
}
