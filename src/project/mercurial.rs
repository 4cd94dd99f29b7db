use super::{dir_name, find_in_ancestors, read_to_string, start_dir, Detector, ProjectError, ProjectResult};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BRANCH: &str = "default";

#[derive(Debug, Clone)]
pub struct Mercurial {
    pub filepath: PathBuf,
}

impl Detector for Mercurial {
    fn detect(&self) -> Result<Option<ProjectResult>, ProjectError> {
        let start = start_dir(&self.filepath)?;

        let hg_dir = match find_in_ancestors(&start, ".hg", fs::Metadata::is_dir) {
            Some(dir) => dir,
            None => return Ok(None),
        };

        let project = hg_dir.parent().map(dir_name).unwrap_or_default();

        let branch = find_branch(&hg_dir).unwrap_or_else(|e| {
            tracing::error!("error finding for branch name from {:?}: {}", hg_dir, e);
            String::new()
        });

        Ok(Some(ProjectResult { project, branch }))
    }

    fn name(&self) -> &'static str {
        "hg-detector"
    }
}

fn find_branch(hg_dir: &Path) -> Result<String, ProjectError> {
    let path = hg_dir.join("branch");
    if !path.is_file() {
        return Ok(DEFAULT_BRANCH.to_owned());
    }

    let content = read_to_string(&path)?;

    match content.lines().next().map(str::trim) {
        Some(branch) if !branch.is_empty() => Ok(branch.to_owned()),
        _ => Ok(DEFAULT_BRANCH.to_owned()),
    }
}
