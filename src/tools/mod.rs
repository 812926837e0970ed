// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Tool resolution
//!
//! Finds the executables a stage needs: either under `<root>/bin` of a
//! toolchain produced by an earlier stage, or on the invoking environment's
//! search path for the bootstrap tools of the first stage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{BootstrapError, BootstrapResult};

/// The logical job a resolved executable does for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolRole {
    /// The configure tool (cmake)
    Configure,
    /// The build driver (ninja)
    BuildDriver,
    /// C compiler
    CCompiler,
    /// C++ compiler
    CxxCompiler,
    /// Linker
    Linker,
    /// Raw profile merge tool
    ProfileMerge,
    /// Test runner
    TestRunner,
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure tool"),
            Self::BuildDriver => write!(f, "build driver"),
            Self::CCompiler => write!(f, "C compiler"),
            Self::CxxCompiler => write!(f, "C++ compiler"),
            Self::Linker => write!(f, "linker"),
            Self::ProfileMerge => write!(f, "profile merge tool"),
            Self::TestRunner => write!(f, "test runner"),
        }
    }
}

/// An absolute path to an executable plus the role it plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReference {
    pub path: PathBuf,
    pub role: ToolRole,
}

impl ToolReference {
    pub fn new(path: impl Into<PathBuf>, role: ToolRole) -> Self {
        Self {
            path: path.into(),
            role,
        }
    }

    pub fn display(&self) -> std::path::Display<'_> {
        self.path.display()
    }
}

/// Tools resolved for one stage, keyed by role
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<ToolRole, ToolReference>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: ToolReference) {
        self.tools.insert(tool.role, tool);
    }

    pub fn get(&self, role: ToolRole) -> Option<&ToolReference> {
        self.tools.get(&role)
    }

    /// Look up a role the stage declared; absence is a topology bug surfaced as ToolNotFound
    pub fn require(&self, role: ToolRole, stage: &str) -> BootstrapResult<&ToolReference> {
        self.tools.get(&role).ok_or_else(|| BootstrapError::ToolNotFound {
            tool: role.to_string(),
            searched: format!("tools resolved for stage '{}'", stage),
            suggestion: format!("Stage '{}' does not declare a {}", stage, role),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// Every tool must exist
    Strict,
    /// Missing tools resolve to where they will be once earlier stages ran
    Planning,
}

/// Looks up executables by name
#[derive(Debug, Clone)]
pub struct ToolResolver {
    search_path: Option<OsString>,
    cwd: PathBuf,
    lookup: Lookup,
}

impl ToolResolver {
    /// Resolver over the invoking environment's `PATH`
    pub fn new() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            lookup: Lookup::Strict,
        }
    }

    /// Resolver over an explicit search path
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            ..Self::new()
        }
    }

    /// Switch to planning lookups, used by dry runs
    pub fn planning(mut self) -> Self {
        self.lookup = Lookup::Planning;
        self
    }

    pub fn is_planning(&self) -> bool {
        self.lookup == Lookup::Planning
    }

    /// Resolve `name` under `<root>/bin`, or on the search path when no root is given
    pub fn resolve(
        &self,
        root: Option<&Path>,
        name: &str,
        role: ToolRole,
    ) -> BootstrapResult<ToolReference> {
        match root {
            Some(root) => self.resolve_in_root(root, name, role),
            None => self.resolve_on_search_path(name, role),
        }
    }

    /// Resolve a user-supplied tool location
    ///
    /// A bare name such as `gcc` is looked up on the search path; anything
    /// containing a path separator must point at an existing file.
    pub fn explicit(&self, path: &Path, role: ToolRole) -> BootstrapResult<ToolReference> {
        if path.components().count() == 1 && !path.is_absolute() {
            return self.resolve_on_search_path(&path.to_string_lossy(), role);
        }

        let absolute = absolutize(path, &self.cwd);
        if absolute.is_file() || self.is_planning() {
            Ok(ToolReference::new(absolute, role))
        } else {
            Err(BootstrapError::tool_not_found(
                &file_name(path),
                absolute.display().to_string(),
            ))
        }
    }

    fn resolve_in_root(
        &self,
        root: &Path,
        name: &str,
        role: ToolRole,
    ) -> BootstrapResult<ToolReference> {
        let bin = absolutize(root, &self.cwd).join("bin");

        // which_in simply reports "not found" for a directory that doesn't exist yet
        match which::which_in(name, Some(bin.as_os_str()), &self.cwd) {
            Ok(path) => Ok(ToolReference::new(path, role)),
            Err(_) if self.is_planning() => Ok(ToolReference::new(bin.join(name), role)),
            Err(_) => Err(BootstrapError::tool_not_found(
                name,
                bin.display().to_string(),
            )),
        }
    }

    fn resolve_on_search_path(&self, name: &str, role: ToolRole) -> BootstrapResult<ToolReference> {
        let found = self
            .search_path
            .as_ref()
            .and_then(|paths| which::which_in(name, Some(paths), &self.cwd).ok());

        match found {
            Some(path) => Ok(ToolReference::new(path, role)),
            None if self.is_planning() => Ok(ToolReference::new(name, role)),
            None => Err(BootstrapError::tool_not_found(name, "PATH")),
        }
    }
}

impl Default for ToolResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Make `path` absolute against `base` without touching the filesystem
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) fn fake_executable(dir: &Path, name: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
