//! Shared test utilities for the release-cutter crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour suites under `tests/`.

use crate::command::CommandExecutor;
use crate::git::{GitCommandError, GitResult, Repository};
use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::process::{ExitStatus, Output};
use tar::{EntryType, Header};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "git").
    pub cmd: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Returns predefined results for an exact, ordered list of invocations.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command invocation: {cmd} {args:?}"));

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args.as_slice(), args);

        call.result
    }
}

/// One entry of a synthetic `git archive` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    path: String,
    kind: FixtureKind,
    mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FixtureKind {
    File(Vec<u8>),
    Directory,
    Symlink(String),
}

impl FixtureFile {
    /// A regular file with mode `0o644`.
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            kind: FixtureKind::File(contents.into()),
            mode: 0o644,
        }
    }

    /// A directory entry; `path` should end with `/` as git writes it.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FixtureKind::Directory,
            mode: 0o755,
        }
    }

    /// A symbolic link pointing at `target`.
    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FixtureKind::Symlink(target.into()),
            mode: 0o777,
        }
    }

    /// Override the mode bits, including any special bits.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// The mode `git archive` reports for this entry under `tar.umask`.
    ///
    /// Git exports regular files as `0o666` or, when executable, `0o777`,
    /// directories as `0o777`, and symlinks unmasked.
    #[must_use]
    pub fn exported_with_umask(mut self, umask: u32) -> Self {
        let base = match self.kind {
            FixtureKind::Symlink(_) => return self,
            FixtureKind::File(_) if self.mode & 0o111 == 0 => 0o666,
            FixtureKind::File(_) | FixtureKind::Directory => 0o777,
        };
        self.mode = base & !umask;
        self
    }
}

/// Host- and commit-dependent metadata stamped into a synthetic stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Modification time of every entry.
    pub mtime: u64,
    /// Owner uid of every entry.
    pub uid: u64,
    /// Owner gid of every entry.
    pub gid: u64,
    /// User and group name of every entry.
    pub owner: &'static str,
    /// Commit id recorded in the pax global header.
    pub commit: &'static str,
}

impl Default for SourceMetadata {
    fn default() -> Self {
        Self {
            mtime: 1_690_000_000,
            uid: 0,
            gid: 0,
            owner: "root",
            commit: "5c2a6f0de1d3c5b2b1b8c5bfa3b2e4f8d9c0a1b2",
        }
    }
}

/// Build a tar stream shaped like `git archive --format=tar` output.
///
/// The stream opens with a pax global header carrying the commit id. That
/// header and its single data record occupy exactly the first 1024 bytes.
///
/// # Panics
///
/// Panics if the in-memory tar writer fails, which indicates a malformed
/// fixture.
#[must_use]
pub fn raw_archive(files: &[FixtureFile], metadata: &SourceMetadata) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    let record = pax_record("comment", metadata.commit);
    let mut global = Header::new_ustar();
    global.set_entry_type(EntryType::XGlobalHeader);
    global.set_size(record.len() as u64);
    global.set_mode(0o666);
    global.set_mtime(metadata.mtime);
    builder
        .append_data(&mut global, "pax_global_header", record.as_slice())
        .expect("global header");

    for file in files {
        let mut header = Header::new_ustar();
        header.set_mode(file.mode);
        header.set_mtime(metadata.mtime);
        header.set_uid(metadata.uid);
        header.set_gid(metadata.gid);
        header.set_username(metadata.owner).expect("owner name");
        header.set_groupname(metadata.owner).expect("group name");
        match &file.kind {
            FixtureKind::File(contents) => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(contents.len() as u64);
                builder
                    .append_data(&mut header, &file.path, contents.as_slice())
                    .expect("file entry");
            }
            FixtureKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                builder
                    .append_data(&mut header, &file.path, io::empty())
                    .expect("directory entry");
            }
            FixtureKind::Symlink(target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                builder
                    .append_link(&mut header, &file.path, target)
                    .expect("symlink entry");
            }
        }
    }

    builder.into_inner().expect("finish raw archive")
}

/// Encode one self-describing pax record: `"<len> <key>=<value>\n"`.
fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = format!(" {key}={value}\n");
    let mut len = body.len();
    while len != body.len() + len.to_string().len() {
        len = body.len() + len.to_string().len();
    }
    format!("{len}{body}").into_bytes()
}

/// In-memory version-control state behind [`FakeRepository`].
#[derive(Debug, Default)]
struct FakeState {
    head: BTreeMap<String, Vec<u8>>,
    tags: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    branch: String,
    commits: Vec<String>,
    archive_calls: u64,
}

/// A [`Repository`] over a real directory with git semantics simulated in
/// memory.
///
/// Files written through [`FakeRepository::new`] form the initial commit and
/// are the tracked set. The working tree is read from disk, so code under
/// test can modify files exactly as it would in a real checkout. Every
/// archive call stamps a different mtime and commit id into the stream.
#[derive(Debug)]
pub struct FakeRepository {
    root: Utf8PathBuf,
    state: RefCell<FakeState>,
}

impl FakeRepository {
    /// Write `files` under `root` and record them as the first commit on
    /// branch `main`.
    ///
    /// # Panics
    ///
    /// Panics if the files cannot be written.
    pub fn new(root: impl Into<Utf8PathBuf>, files: &[(&str, &str)]) -> Self {
        let root = root.into();
        let mut head = BTreeMap::new();
        for (path, contents) in files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("create fixture directory");
            }
            std::fs::write(&full, contents).expect("write fixture file");
            head.insert((*path).to_owned(), contents.as_bytes().to_vec());
        }
        Self {
            root,
            state: RefCell::new(FakeState {
                head,
                branch: "main".to_owned(),
                commits: vec!["initial".to_owned()],
                ..FakeState::default()
            }),
        }
    }

    /// Check out a different branch name.
    #[must_use]
    pub fn on_branch(self, branch: &str) -> Self {
        self.state.borrow_mut().branch = branch.to_owned();
        self
    }

    /// Tag the current head.
    #[must_use]
    pub fn tagged(self, tag: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let snapshot = state.head.clone();
            state.tags.insert(tag.to_owned(), snapshot);
        }
        self
    }

    /// The working tree root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Overwrite a tracked or untracked file in the working tree.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_file(&self, path: &str, contents: &str) {
        std::fs::write(self.root.join(path), contents).expect("write working tree file");
    }

    /// Read a working tree file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path)).expect("read working tree file")
    }

    /// Commit messages in order, starting with the initial commit.
    #[must_use]
    pub fn commits(&self) -> Vec<String> {
        self.state.borrow().commits.clone()
    }

    /// Names of all tags.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.keys().cloned().collect()
    }

    /// Number of archive streams produced so far.
    #[must_use]
    pub fn archive_calls(&self) -> u64 {
        self.state.borrow().archive_calls
    }

    fn working_copy(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.root.join(path)).ok()
    }

    fn failure(args: &[&str], stderr: &str) -> GitCommandError {
        GitCommandError::Failed {
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            status: exit_status(128),
            stdout: String::new(),
            stderr: stderr.to_owned(),
        }
    }
}

impl Repository for FakeRepository {
    fn is_clean(&self) -> GitResult<bool> {
        let state = self.state.borrow();
        Ok(state
            .head
            .iter()
            .all(|(path, committed)| self.working_copy(path).as_ref() == Some(committed)))
    }

    fn current_branch(&self) -> GitResult<String> {
        Ok(self.state.borrow().branch.clone())
    }

    fn tag_exists(&self, tag: &ReleaseTag) -> GitResult<bool> {
        Ok(self.state.borrow().tags.contains_key(tag.as_str()))
    }

    fn archive(&self, reference: &str, paths: &[String]) -> GitResult<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        let snapshot = if reference == "HEAD" {
            state.head.clone()
        } else {
            state.tags.get(reference).cloned().ok_or_else(|| {
                Self::failure(
                    &["archive", reference],
                    &format!("fatal: not a valid object name: {reference}"),
                )
            })?
        };
        state.archive_calls += 1;

        let selected: Vec<(&String, &Vec<u8>)> = snapshot
            .iter()
            .filter(|(path, _)| paths.iter().any(|spec| pathspec_matches(spec, path)))
            .collect();

        let mut files = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        for (path, contents) in selected {
            for (slash, _) in path.match_indices('/') {
                let dir = &path[..=slash];
                if seen_dirs.insert(dir.to_owned()) {
                    files.push(FixtureFile::directory(dir));
                }
            }
            files.push(FixtureFile::new(path.clone(), contents.clone()));
        }

        let calls = state.archive_calls;
        let commit: &'static str = if calls % 2 == 0 {
            "2222222222222222222222222222222222222222"
        } else {
            "1111111111111111111111111111111111111111"
        };
        Ok(raw_archive(
            &files,
            &SourceMetadata {
                mtime: 1_700_000_000 + calls * 3_600,
                uid: 1000 + calls,
                gid: 1000,
                owner: "builder",
                commit,
            },
        ))
    }

    fn commit(&self, message: &str) -> GitResult<()> {
        if self.is_clean()? {
            return Err(Self::failure(
                &["commit", "--all", "--message", message],
                "nothing to commit, working tree clean",
            ));
        }
        let mut state = self.state.borrow_mut();
        let tracked: Vec<String> = state.head.keys().cloned().collect();
        for path in tracked {
            match self.working_copy(&path) {
                Some(contents) => {
                    state.head.insert(path, contents);
                }
                None => {
                    state.head.remove(&path);
                }
            }
        }
        state.commits.push(message.to_owned());
        Ok(())
    }

    fn create_tag(&self, tag: &ReleaseTag) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.tags.contains_key(tag.as_str()) {
            return Err(Self::failure(
                &["tag", tag.as_str()],
                &format!("fatal: tag '{tag}' already exists"),
            ));
        }
        let snapshot = state.head.clone();
        state.tags.insert(tag.as_str().to_owned(), snapshot);
        Ok(())
    }
}

/// Minimal pathspec matching: exact paths, directory prefixes and a
/// trailing `*` wildcard that crosses directory boundaries, as git's does.
fn pathspec_matches(spec: &str, path: &str) -> bool {
    if let Some(prefix) = spec.strip_suffix('*') {
        return path.starts_with(prefix);
    }
    let spec = spec.trim_end_matches('/');
    path == spec
        || path
            .strip_prefix(spec)
            .is_some_and(|rest| rest.starts_with('/'))
}
