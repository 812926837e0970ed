// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Raw, unvalidated settings
//!
//! Settings come from an optional config file (TOML or YAML) and from the
//! command line. Both produce a [`Settings`] value; command-line values are
//! laid over file values with [`Settings::overlay`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{FlagChannel, LtoMode};
use crate::errors::{BootstrapError, BootstrapResult};

/// Config file name looked up in the user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Every option a pipeline run understands, all optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    // Required paths
    pub install_prefix: Option<PathBuf>,
    pub src_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,

    // Tool locations
    pub cmake_binary: Option<PathBuf>,
    pub ninja_binary: Option<PathBuf>,
    pub bootstrap_cc: Option<PathBuf>,
    pub bootstrap_clang: Option<PathBuf>,
    pub bootstrap_lld: Option<PathBuf>,
    pub default_clang: Option<PathBuf>,

    // Toggles
    pub skip_stage2: Option<bool>,
    pub skip_stage2_test: Option<bool>,
    pub skip_pass1: Option<bool>,
    pub skip_test: Option<bool>,
    pub config_only: Option<bool>,
    pub debug: Option<bool>,
    pub native: Option<bool>,
    pub use_newpm: Option<bool>,
    pub enable_libcxx: Option<bool>,
    pub static_cxx_stdlib: Option<bool>,
    pub lto: Option<LtoMode>,
    pub compiler_flag_channel: Option<FlagChannel>,

    // Optional inputs
    pub binutils_include: Option<PathBuf>,
    pub llvm_test_suite_path: Option<PathBuf>,

    /// Extra `-DKEY=VALUE` configure defines
    pub defines: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings from a TOML or YAML file, chosen by extension
    pub fn from_file(path: &Path) -> BootstrapResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BootstrapError::ConfigFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    /// Parse settings from a TOML string
    pub fn from_toml(toml: &str) -> BootstrapResult<Self> {
        toml::from_str(toml).map_err(Into::into)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> BootstrapResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Default user config file, if the platform has a config directory
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clang-bootstrap")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load an explicit config file, or the user config file when it exists
    pub fn load(explicit: Option<&Path>) -> BootstrapResult<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::user_config_path() {
                Some(path) if path.is_file() => {
                    tracing::debug!(path = %path.display(), "loading user config");
                    Self::from_file(&path)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// Lay `over` on top of `self`; any value set in `over` wins
    pub fn overlay(self, over: Settings) -> Settings {
        let mut defines = self.defines;
        defines.extend(over.defines);

        Settings {
            install_prefix: over.install_prefix.or(self.install_prefix),
            src_dir: over.src_dir.or(self.src_dir),
            build_dir: over.build_dir.or(self.build_dir),
            cmake_binary: over.cmake_binary.or(self.cmake_binary),
            ninja_binary: over.ninja_binary.or(self.ninja_binary),
            bootstrap_cc: over.bootstrap_cc.or(self.bootstrap_cc),
            bootstrap_clang: over.bootstrap_clang.or(self.bootstrap_clang),
            bootstrap_lld: over.bootstrap_lld.or(self.bootstrap_lld),
            default_clang: over.default_clang.or(self.default_clang),
            skip_stage2: over.skip_stage2.or(self.skip_stage2),
            skip_stage2_test: over.skip_stage2_test.or(self.skip_stage2_test),
            skip_pass1: over.skip_pass1.or(self.skip_pass1),
            skip_test: over.skip_test.or(self.skip_test),
            config_only: over.config_only.or(self.config_only),
            debug: over.debug.or(self.debug),
            native: over.native.or(self.native),
            use_newpm: over.use_newpm.or(self.use_newpm),
            enable_libcxx: over.enable_libcxx.or(self.enable_libcxx),
            static_cxx_stdlib: over.static_cxx_stdlib.or(self.static_cxx_stdlib),
            lto: over.lto.or(self.lto),
            compiler_flag_channel: over.compiler_flag_channel.or(self.compiler_flag_channel),
            binutils_include: over.binutils_include.or(self.binutils_include),
            llvm_test_suite_path: over.llvm_test_suite_path.or(self.llvm_test_suite_path),
            defines,
        }
    }
}

/// Parse a `KEY=VALUE` define from the command line
pub fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_toml_settings() {
        let settings = Settings::from_toml(
            r#"
install_prefix = "/opt/llvm"
src_dir = "/src/llvm-project/llvm"
build_dir = "/build"
native = true
lto = "full"

[defines]
LLVM_TARGETS_TO_BUILD = "X86"
"#,
        )
        .unwrap();

        assert_eq!(settings.install_prefix, Some(PathBuf::from("/opt/llvm")));
        assert_eq!(settings.native, Some(true));
        assert_eq!(settings.lto, Some(LtoMode::Full));
        assert_eq!(
            settings.defines.get("LLVM_TARGETS_TO_BUILD").map(String::as_str),
            Some("X86")
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Settings::from_toml("instal_prefix = \"/opt\"").is_err());
    }

    #[test]
    fn test_yaml_file_is_detected_by_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pgo.yaml");
        std::fs::write(&path, "skip_pass1: true\ndefault_clang: /opt/clang-17\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.skip_pass1, Some(true));
        assert_eq!(settings.default_clang, Some(PathBuf::from("/opt/clang-17")));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = Settings::from_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigFile { .. }));
    }

    #[test]
    fn test_overlay_prefers_command_line() {
        let file = Settings {
            install_prefix: Some("/opt/from-file".into()),
            native: Some(true),
            defines: [("A".to_string(), "1".to_string())].into_iter().collect(),
            ..Settings::default()
        };
        let cli = Settings {
            install_prefix: Some("/opt/from-cli".into()),
            defines: [("B".to_string(), "2".to_string())].into_iter().collect(),
            ..Settings::default()
        };

        let merged = file.overlay(cli);
        assert_eq!(merged.install_prefix, Some(PathBuf::from("/opt/from-cli")));
        assert_eq!(merged.native, Some(true));
        assert_eq!(merged.defines.len(), 2);
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("LLVM_PARALLEL_LINK_JOBS=2").unwrap(),
            ("LLVM_PARALLEL_LINK_JOBS".to_string(), "2".to_string())
        );
        assert!(parse_define("=2").is_err());
        assert!(parse_define("NOVALUE").is_err());
    }
}
