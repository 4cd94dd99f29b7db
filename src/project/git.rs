use super::{dir_name, find_in_ancestors, start_dir, Detector, ProjectError, ProjectResult};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Branch reported when HEAD points at a commit no local branch points at.
pub const DETACHED_HEAD: &str = "HEAD";

#[derive(Debug, Clone)]
pub struct Git {
    pub filepath: PathBuf,
}

impl Detector for Git {
    fn detect(&self) -> Result<Option<ProjectResult>, ProjectError> {
        let start = start_dir(&self.filepath)?;

        let dotgit = match find_in_ancestors(&start, ".git", |_| true) {
            Some(path) => path,
            None => return Ok(None),
        };

        let repo = open(&dotgit)?;
        let project = project_name(&repo, &dotgit)?;

        let branch = find_branch(&repo).unwrap_or_else(|e| {
            tracing::error!("error finding for branch name from {:?}: {}", repo.git_dir(), e);
            String::new()
        });

        Ok(Some(ProjectResult { project, branch }))
    }

    fn name(&self) -> &'static str {
        "git-detector"
    }
}

/// Opens the repository owning `dotgit`, either a `.git` directory or a
/// `gitdir: <path>` file. A `.git` file that can't be followed is fatal.
fn open(dotgit: &Path) -> Result<gix::Repository, ProjectError> {
    let work_tree = dotgit.parent().unwrap_or(dotgit);

    gix::open(work_tree).map_err(|e| {
        if dotgit.is_file() {
            ProjectError::GitPointer {
                path: dotgit.to_path_buf(),
                reason: e.to_string(),
            }
        } else {
            ProjectError::GitOpen {
                path: dotgit.to_path_buf(),
                source: Box::new(e),
            }
        }
    })
}

fn project_name(repo: &gix::Repository, dotgit: &Path) -> Result<String, ProjectError> {
    let git_dir = canonical(repo.git_dir())?;
    let common_dir = canonical(repo.common_dir())?;

    // Linked work trees keep their HEAD in <repo>/.git/worktrees/<name> and
    // are named after the main repository. Submodules are named after
    // their own directory.
    if git_dir != common_dir {
        return Ok(project_of_common_dir(&common_dir));
    }

    Ok(dotgit.parent().map(dir_name).unwrap_or_default())
}

fn canonical(path: &Path) -> Result<PathBuf, ProjectError> {
    fs::canonicalize(path).map_err(|source| ProjectError::RealPath {
        path: path.to_path_buf(),
        source,
    })
}

// <repo>/.git names the project after <repo>, a bare <name>.git after <name>
fn project_of_common_dir(common_dir: &Path) -> String {
    if common_dir.file_name() == Some(OsStr::new(".git")) {
        return common_dir.parent().map(dir_name).unwrap_or_default();
    }

    let name = dir_name(common_dir);
    match name.strip_suffix(".git") {
        Some(stripped) => stripped.to_owned(),
        None => name,
    }
}

fn find_branch(repo: &gix::Repository) -> Result<String, ProjectError> {
    let head = repo.head().map_err(|e| malformed(repo.git_dir(), e))?;

    if let Some(name) = head.referent_name() {
        return Ok(short_branch_name(name));
    }

    let commit = match head.id() {
        Some(id) => id.detach(),
        None => return Ok(DETACHED_HEAD.to_owned()),
    };

    Ok(branch_at_commit(repo, commit)?.unwrap_or_else(|| DETACHED_HEAD.to_owned()))
}

/// First local branch, by name, whose tip is `commit`. Loose refs shadow
/// packed ones.
fn branch_at_commit(
    repo: &gix::Repository,
    commit: gix::ObjectId,
) -> Result<Option<String>, ProjectError> {
    let references = repo
        .references()
        .map_err(|e| malformed(repo.common_dir(), e))?;
    let branches = references
        .local_branches()
        .map_err(|e| malformed(repo.common_dir(), e))?;

    let matching: BTreeSet<String> = branches
        .flatten()
        .filter(|branch| branch.try_id().map(|id| id.detach()) == Some(commit))
        .map(|branch| short_branch_name(branch.name()))
        .collect();

    Ok(matching.into_iter().next())
}

// refs/heads/<name> → <name>, anything else stays a full ref name
fn short_branch_name(name: &gix::refs::FullNameRef) -> String {
    let name = name.as_bstr().to_string();

    match name.strip_prefix("refs/heads/") {
        Some(branch) => branch.to_owned(),
        None => name,
    }
}

fn malformed(path: &Path, reason: impl ToString) -> ProjectError {
    ProjectError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::process::Command;
    use tempfile::TempDir;

    /// Runs git in `dir` and returns its stdout.
    pub(crate) fn run_git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap_or_else(|e| panic!("git {} failed: {}", args.join(" "), e));
        assert!(
            output.status.success(),
            "git {} failed:\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Creates a repository at `path` with `main` checked out.
    pub(crate) fn init_repo(path: &Path) {
        fs::create_dir_all(path).unwrap();
        run_git(path, &["init", "-q", "--initial-branch=main"]);

        for (key, value) in [
            ("user.email", "test@wk.dev"),
            ("user.name", "wk test"),
            ("commit.gpgsign", "false"),
        ] {
            run_git(path, &["config", key, value]);
        }
    }

    fn commit(path: &Path) -> String {
        run_git(path, &["commit", "-q", "--allow-empty", "-m", "commit"]);
        run_git(path, &["rev-parse", "HEAD"]).trim().to_owned()
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// `<tmp>/wakatime-cli` as a git repository with a source file.
    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("wakatime-cli");
        init_repo(&root);

        let file = root.join("src/pkg/file.go");
        write(&file, "");

        (dir, root, file)
    }

    fn detect(file: &Path) -> ProjectResult {
        Git {
            filepath: file.to_path_buf(),
        }
        .detect()
        .unwrap()
        .unwrap()
    }

    #[test]
    fn unborn_branch() {
        let (_dir, root, file) = setup();
        run_git(&root, &["symbolic-ref", "HEAD", "refs/heads/feature/login"]);

        assert_eq!(
            detect(&file),
            ProjectResult {
                project: "wakatime-cli".into(),
                branch: "feature/login".into(),
            }
        );
    }

    #[test]
    fn checked_out_branch() {
        let (_dir, root, file) = setup();
        commit(&root);
        run_git(&root, &["checkout", "-q", "-b", "billing"]);

        assert_eq!(detect(&file).branch, "billing");
    }

    #[test]
    fn detached_head_matching_loose_ref() {
        let (_dir, root, file) = setup();
        commit(&root);
        run_git(&root, &["branch", "release/1.0"]);
        commit(&root);
        run_git(&root, &["checkout", "-q", "--detach", "release/1.0"]);

        assert_eq!(detect(&file).branch, "release/1.0");
    }

    #[test]
    fn detached_head_matching_packed_ref() {
        let (_dir, root, file) = setup();
        commit(&root);
        run_git(&root, &["branch", "release/1.0"]);
        commit(&root);
        run_git(&root, &["pack-refs", "--all"]);
        assert!(!root.join(".git/refs/heads/release/1.0").exists());
        run_git(&root, &["checkout", "-q", "--detach", "release/1.0"]);

        assert_eq!(detect(&file).branch, "release/1.0");
    }

    #[test]
    fn loose_ref_shadows_packed_ref() {
        let (_dir, root, file) = setup();
        let first = commit(&root);
        run_git(&root, &["pack-refs", "--all"]);
        // main moves on as a loose ref while packed-refs still holds `first`
        commit(&root);
        run_git(&root, &["checkout", "-q", "--detach", &first]);

        assert_eq!(detect(&file).branch, DETACHED_HEAD);
    }

    #[test]
    fn several_matching_branches_pick_first_by_name() {
        let (_dir, root, file) = setup();
        commit(&root);
        run_git(&root, &["branch", "zeta"]);
        run_git(&root, &["branch", "alpha"]);
        commit(&root);
        run_git(&root, &["checkout", "-q", "--detach", "zeta"]);

        assert_eq!(detect(&file).branch, "alpha");
    }

    #[test]
    fn detached_head_without_branch() {
        let (_dir, root, file) = setup();
        commit(&root);
        run_git(&root, &["checkout", "-q", "--detach"]);
        commit(&root);

        assert_eq!(detect(&file).branch, "HEAD");
    }

    #[test]
    fn garbage_head_is_not_fatal() {
        let (_dir, root, file) = setup();
        write(&root.join(".git/HEAD"), "what is this\n");

        match (Git { filepath: file }).detect() {
            Err(err) => assert!(!err.is_fatal(), "{}", err),
            Ok(result) => assert_eq!(result.map(|r| r.branch), Some(String::new())),
        }
    }

    #[test]
    fn linked_worktree() {
        let (dir, root, _file) = setup();
        commit(&root);
        run_git(&root, &["worktree", "add", "-q", "-b", "hotfix", "../hotfix-checkout"]);

        let file = dir.path().join("hotfix-checkout/main.go");
        write(&file, "");

        assert_eq!(
            detect(&file),
            ProjectResult {
                project: "wakatime-cli".into(),
                branch: "hotfix".into(),
            }
        );
    }

    #[test]
    fn linked_worktree_detached_uses_shared_refs() {
        let (dir, root, _file) = setup();
        commit(&root);
        run_git(&root, &["branch", "bugfix"]);
        commit(&root);
        run_git(&root, &["worktree", "add", "-q", "--detach", "../wt", "bugfix"]);

        let file = dir.path().join("wt/main.go");
        write(&file, "");

        assert_eq!(
            detect(&file),
            ProjectResult {
                project: "wakatime-cli".into(),
                branch: "bugfix".into(),
            }
        );
    }

    #[test]
    fn submodule_relative_pointer() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("super");
        init_repo(&root);

        let modules = root.join(".git/modules/lib");
        let lib = root.join("lib");
        std::fs::create_dir_all(modules.parent().unwrap()).unwrap();
        run_git(
            &root,
            &[
                "init",
                "-q",
                "--initial-branch=develop",
                "--separate-git-dir",
                modules.to_str().unwrap(),
                lib.to_str().unwrap(),
            ],
        );
        write(&lib.join(".git"), "gitdir: ../.git/modules/lib\n");

        let file = lib.join("src/lib.rs");
        write(&file, "");

        assert_eq!(
            detect(&file),
            ProjectResult {
                project: "lib".into(),
                branch: "develop".into(),
            }
        );
    }

    #[test]
    fn malformed_pointer_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        write(&root.join(".git"), "not a pointer\n");
        let file = root.join("main.go");
        write(&file, "");

        let err = Git { filepath: file }.detect().unwrap_err();
        assert!(err.is_fatal(), "{}", err);
    }

    #[test]
    fn dangling_pointer_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        write(&root.join(".git"), "gitdir: ../nowhere/.git/worktrees/x\n");
        let file = root.join("main.go");
        write(&file, "");

        let err = Git { filepath: file }.detect().unwrap_err();
        assert!(matches!(err, ProjectError::GitPointer { .. }));
    }

    #[test]
    fn bare_common_dir_name() {
        assert_eq!(project_of_common_dir(Path::new("/srv/repos/tools.git")), "tools");
        assert_eq!(project_of_common_dir(Path::new("/home/me/tools/.git")), "tools");
    }

    #[test]
    fn no_repository() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.go");
        write(&file, "");

        assert_eq!(Git { filepath: file }.detect().unwrap(), None);
    }
}
