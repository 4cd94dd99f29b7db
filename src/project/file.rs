use super::{dir_name, find_in_ancestors, read_to_string, start_dir, Detector, ProjectError, ProjectResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = ".wakatime-project";

/// Explicit project naming through a `.wakatime-project` file.
///
/// The first line is the project name, the optional second line the branch.
/// An empty first line falls back to the name of the directory holding the
/// file.
#[derive(Debug, Clone)]
pub struct File {
    pub filepath: PathBuf,
}

impl Detector for File {
    fn detect(&self) -> Result<Option<ProjectResult>, ProjectError> {
        let path = match find_file(&self.filepath)? {
            Some(path) => path,
            None => return Ok(None),
        };

        let content = read_to_string(&path)?;
        let mut lines = content.lines().map(str::trim);

        let project = match lines.next() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => path.parent().map(dir_name).unwrap_or_default(),
        };
        let branch = lines.next().unwrap_or_default().to_owned();

        Ok(Some(ProjectResult { project, branch }))
    }

    fn name(&self) -> &'static str {
        "project-file-detector"
    }
}

/// Closest `.wakatime-project` file above `filepath`.
pub fn find_file(filepath: &Path) -> Result<Option<PathBuf>, ProjectError> {
    let start = start_dir(filepath)?;
    Ok(find_in_ancestors(&start, PROJECT_FILE, fs::Metadata::is_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("wakatime-cli");
        fs::create_dir_all(root.join("src/pkg")).unwrap();
        fs::write(root.join(PROJECT_FILE), content).unwrap();

        let file = root.join("src/pkg/file.go");
        fs::write(&file, "").unwrap();

        (dir, file)
    }

    #[test]
    fn project_and_branch() {
        let (_dir, file) = setup("wakatime-cli-override\nmaster\n");

        let result = File { filepath: file }.detect().unwrap();
        assert_eq!(
            result,
            Some(ProjectResult {
                project: "wakatime-cli-override".into(),
                branch: "master".into(),
            })
        );
    }

    #[test]
    fn empty_file_uses_directory_name() {
        let (_dir, file) = setup("");

        let result = File { filepath: file }.detect().unwrap();
        assert_eq!(
            result,
            Some(ProjectResult {
                project: "wakatime-cli".into(),
                branch: String::new(),
            })
        );
    }

    #[test]
    fn not_found() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.go");
        fs::write(&file, "").unwrap();

        assert_eq!(File { filepath: file.clone() }.detect().unwrap(), None);
        assert_eq!(find_file(&file).unwrap(), None);
    }

    #[test]
    fn missing_entity_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = find_file(&dir.path().join("gone.go")).unwrap_err();
        assert!(matches!(err, ProjectError::RealPath { .. }));
    }
}
