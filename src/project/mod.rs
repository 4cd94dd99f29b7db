//! Project and branch detection.
//!
//! Backends are tried in a fixed order: the `.wakatime-project` override
//! file, then Git, Mercurial and Subversion metadata. The first backend that
//! recognizes the path wins.

pub mod file;
pub mod git;
pub mod mercurial;
pub mod subversion;

use crate::handle::{Handle, HandleOption};
use crate::heartbeat::{EntityType, HeartBeat};
use std::fs;
use std::path::{Path, PathBuf};

pub use file::File;
pub use git::Git;
pub use mercurial::Mercurial;
pub use subversion::Subversion;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectResult {
    pub project: String,
    pub branch: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to get the real path of {path:?}: {source}")]
    RealPath {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed while reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed metadata in {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// A `.git` file that doesn't lead to a usable git directory.
    #[error("invalid gitdir pointer {path:?}: {reason}")]
    GitPointer { path: PathBuf, reason: String },

    #[error("failed to open git repository {path:?}: {source}")]
    GitOpen {
        path: PathBuf,
        source: Box<gix::open::Error>,
    },

    #[error("failed to query svn working copy database {path:?}: {source}")]
    SvnDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
}

impl ProjectError {
    /// Fatal errors abort the whole batch instead of falling through to the
    /// next backend.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::GitPointer { .. })
    }
}

pub trait Detector {
    /// `Ok(None)` means this backend doesn't recognize the path.
    fn detect(&self) -> Result<Option<ProjectResult>, ProjectError>;

    fn name(&self) -> &'static str;
}

/// Project detection overrides applied after the backends ran.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// Used when no backend detects a project.
    pub alternative: Option<String>,
    /// Replaces whatever project name was detected.
    pub override_name: Option<String>,
}

pub fn with_detection<'a>(config: ProjectConfig) -> HandleOption<'a> {
    Box::new(move |mut next: Handle<'a>| -> Handle<'a> {
        Box::new(move |mut hh: Vec<HeartBeat>| {
            for h in hh.iter_mut() {
                if h.entity_type == EntityType::File {
                    let detected = detect(Path::new(&h.entity)).map_err(|e| {
                        anyhow::Error::new(e)
                            .context(format!("failed to detect project of {:?}", h.entity))
                    })?;

                    if let Some(result) = detected {
                        h.project = Some(result.project).filter(|p| !p.is_empty());
                        h.branch = Some(result.branch).filter(|b| !b.is_empty());
                    }
                }

                if let Some(name) = &config.override_name {
                    h.project = Some(name.clone());
                }

                if h.project.is_none() {
                    h.project = config.alternative.clone();
                }
            }

            next(hh)
        })
    })
}

/// Runs the backends against `filepath`.
///
/// An override file without a branch line borrows the branch of the first
/// VCS backend that recognizes the path.
pub fn detect(filepath: &Path) -> Result<Option<ProjectResult>, ProjectError> {
    let filepath = filepath.to_path_buf();

    let overridden = run(&File {
        filepath: filepath.clone(),
    })?;

    if let Some(result) = &overridden {
        if !result.branch.is_empty() {
            return Ok(overridden);
        }
    }

    let vcs: [Box<dyn Detector>; 3] = [
        Box::new(Git {
            filepath: filepath.clone(),
        }),
        Box::new(Mercurial {
            filepath: filepath.clone(),
        }),
        Box::new(Subversion { filepath }),
    ];

    for detector in vcs.iter() {
        if let Some(found) = run(detector.as_ref())? {
            return Ok(Some(match overridden {
                Some(result) => ProjectResult {
                    project: result.project,
                    branch: found.branch,
                },
                None => found,
            }));
        }
    }

    Ok(overridden)
}

fn run(detector: &dyn Detector) -> Result<Option<ProjectResult>, ProjectError> {
    match detector.detect() {
        Ok(Some(result)) => {
            tracing::debug!(
                detector = detector.name(),
                project = %result.project,
                branch = %result.branch,
                "detected project"
            );
            Ok(Some(result))
        }
        Ok(None) => Ok(None),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(detector = detector.name(), "{}", e);
            Ok(None)
        }
    }
}

/// Canonical directory to start an ancestor walk from. Files start at their
/// parent directory.
pub(crate) fn start_dir(filepath: &Path) -> Result<PathBuf, ProjectError> {
    let real = fs::canonicalize(filepath).map_err(|source| ProjectError::RealPath {
        path: filepath.to_path_buf(),
        source,
    })?;

    if real.is_dir() {
        return Ok(real);
    }

    Ok(real.parent().map(Path::to_path_buf).unwrap_or(real))
}

/// Closest `<ancestor>/<name>` accepted by `accept`, walking up to the
/// filesystem root. Entries that can't be inspected count as missing.
pub(crate) fn find_in_ancestors(
    start: &Path,
    name: &str,
    accept: impl Fn(&fs::Metadata) -> bool,
) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| fs::metadata(candidate).map_or(false, |m| accept(&m)))
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, ProjectError> {
    fs::read_to_string(path).map_err(|source| ProjectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
