//! Explicit search path and variables handed to subprocesses

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// The environment every external tool runs with
///
/// Built once from the process `PATH`, extended by the toolchain resolver,
/// then only read. Subprocesses get it through [`ToolEnvironment::apply_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnvironment {
    search_path: Vec<PathBuf>,
    vars: BTreeMap<String, String>,
}

impl ToolEnvironment {
    /// Build from a `PATH`-style value
    pub fn from_path_var(path: Option<OsString>) -> Self {
        let search_path = path
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self {
            search_path,
            vars: BTreeMap::new(),
        }
    }

    /// Snapshot the current process `PATH`
    pub fn from_process() -> Self {
        Self::from_path_var(std::env::var_os("PATH"))
    }

    /// An environment that only sees `dir`
    pub fn isolated(dir: impl Into<PathBuf>) -> Self {
        Self {
            search_path: vec![dir.into()],
            vars: BTreeMap::new(),
        }
    }

    /// Put `dir` first on the search path
    pub fn prepend(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.search_path.retain(|existing| existing != &dir);
        self.search_path.insert(0, dir);
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// The search path joined into a `PATH` value
    pub fn path_var(&self) -> Option<OsString> {
        std::env::join_paths(&self.search_path).ok()
    }

    /// Locate `name` on the search path
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.components().count() > 1 {
            return is_executable(direct).then(|| direct.to_path_buf());
        }

        self.search_path.iter().find_map(|dir| {
            candidate_names(name)
                .into_iter()
                .map(|candidate| dir.join(candidate))
                .find(|path| is_executable(path))
        })
    }

    /// Configure `command` to run inside this environment
    pub fn apply_to(&self, command: &mut Command) {
        if let Some(path) = self.path_var() {
            command.env("PATH", path);
        }
        command.envs(&self.vars);
    }
}

#[cfg(windows)]
fn candidate_names(name: &str) -> Vec<String> {
    vec![
        format!("{}.exe", name),
        format!("{}.cmd", name),
        name.to_string(),
    ]
}

#[cfg(not(windows))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
