// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Run configuration
//!
//! [`Configuration`] is the validated, immutable value every pipeline run is
//! driven by. It is produced once from [`Settings`] before any stage starts;
//! anything missing or unresolvable at that point is a configuration error
//! and the pipeline never begins.

mod settings;

pub use settings::{parse_define, Settings, CONFIG_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{BootstrapError, BootstrapResult};
use crate::pipeline::layout;
use crate::tools::{absolutize, ToolReference, ToolResolver, ToolRole};

/// Which fixed stage topology to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// stage1 with the host compiler, stage2 with stage1's compiler
    Bootstrap,
    /// A single stage built with an existing clang and lld
    Default,
    /// Instrumented pass1, profile merge, optimized pass2
    Pgo,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Default => write!(f, "default"),
            Self::Pgo => write!(f, "pgo"),
        }
    }
}

/// Link-time optimization used by the profile-consuming pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LtoMode {
    #[default]
    Thin,
    Full,
    Off,
}

impl LtoMode {
    /// Value for `LLVM_ENABLE_LTO`, if LTO is on
    pub fn cmake_value(self) -> Option<&'static str> {
        match self {
            Self::Thin => Some("Thin"),
            Self::Full => Some("Full"),
            Self::Off => None,
        }
    }
}

impl std::str::FromStr for LtoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "thin" => Ok(Self::Thin),
            "full" => Ok(Self::Full),
            "off" => Ok(Self::Off),
            _ => Err(format!("Unknown LTO mode: {}", s)),
        }
    }
}

/// How compiler or linker flags reach the configure step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagChannel {
    /// As `-DCMAKE_<LANG>_FLAGS=...` configure arguments
    #[default]
    Arg,
    /// As `CFLAGS`/`CXXFLAGS`/`LDFLAGS` in the process environment overlay
    Env,
}

impl std::str::FromStr for FlagChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arg" => Ok(Self::Arg),
            "env" => Ok(Self::Env),
            _ => Err(format!("Unknown flag channel: {}", s)),
        }
    }
}

/// Named toggles and optional inputs that shape commands and topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    pub skip_stage2: bool,
    pub skip_stage2_test: bool,
    pub skip_pass1: bool,
    pub skip_test: bool,
    pub config_only: bool,
    pub debug: bool,
    pub native: bool,
    pub use_newpm: bool,
    pub enable_libcxx: bool,
    pub static_cxx_stdlib: bool,
    pub lto: LtoMode,
    pub compiler_flag_channel: FlagChannel,
    pub binutils_include: Option<PathBuf>,
    pub llvm_test_suite_path: Option<PathBuf>,
    pub extra_defines: Vec<(String, String)>,
}

/// Externally supplied tools for the first stage of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapTools {
    /// C compiler the first stage is configured with
    pub compiler: Option<ToolReference>,
    /// Linker the first stage is configured with
    pub linker: Option<ToolReference>,
    /// Root of a previously installed clang (`<root>/bin/clang`)
    pub default_toolchain: Option<PathBuf>,
}

impl BootstrapTools {
    pub fn for_role(&self, role: ToolRole) -> Option<&ToolReference> {
        match role {
            ToolRole::CCompiler => self.compiler.as_ref(),
            ToolRole::Linker => self.linker.as_ref(),
            _ => None,
        }
    }
}

/// Validated configuration for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub mode: PipelineMode,
    pub install_prefix: PathBuf,
    pub src_dir: PathBuf,
    pub build_root: PathBuf,
    pub cmake: ToolReference,
    pub ninja: ToolReference,
    pub bootstrap: BootstrapTools,
    pub options: BuildOptions,
}

impl Configuration {
    /// Validate settings and resolve every tool needed before the first stage
    pub fn resolve(
        mode: PipelineMode,
        settings: Settings,
        resolver: &ToolResolver,
    ) -> BootstrapResult<Self> {
        let cwd = std::env::current_dir()?;

        let install_prefix = required_path(settings.install_prefix, "install_prefix", &cwd)?;
        let src_dir = required_path(settings.src_dir, "src_dir", &cwd)?;
        let build_root = required_path(settings.build_dir, "build_dir", &cwd)?;

        if !src_dir.is_dir() {
            return Err(BootstrapError::configuration(
                format!("Source directory does not exist: {}", src_dir.display()),
                Some("Point --src-dir at the llvm/ directory of an llvm-project checkout"),
            ));
        }

        let cmake = tool_or_default(resolver, settings.cmake_binary, "cmake", ToolRole::Configure)?;
        let ninja = tool_or_default(resolver, settings.ninja_binary, "ninja", ToolRole::BuildDriver)?;

        let options = BuildOptions {
            skip_stage2: settings.skip_stage2.unwrap_or(false),
            skip_stage2_test: settings.skip_stage2_test.unwrap_or(false),
            skip_pass1: settings.skip_pass1.unwrap_or(false),
            skip_test: settings.skip_test.unwrap_or(false),
            config_only: settings.config_only.unwrap_or(false),
            debug: settings.debug.unwrap_or(false),
            native: settings.native.unwrap_or(false),
            use_newpm: settings.use_newpm.unwrap_or(false),
            enable_libcxx: settings.enable_libcxx.unwrap_or(false),
            static_cxx_stdlib: settings.static_cxx_stdlib.unwrap_or(false),
            lto: settings.lto.unwrap_or_default(),
            compiler_flag_channel: settings.compiler_flag_channel.unwrap_or_default(),
            binutils_include: settings.binutils_include.map(|p| absolutize(&p, &cwd)),
            llvm_test_suite_path: settings.llvm_test_suite_path.map(|p| absolutize(&p, &cwd)),
            extra_defines: settings.defines.into_iter().collect(),
        };

        let bootstrap = match mode {
            PipelineMode::Bootstrap => BootstrapTools {
                compiler: Some(tool_or_default(
                    resolver,
                    settings.bootstrap_cc,
                    "gcc",
                    ToolRole::CCompiler,
                )?),
                ..BootstrapTools::default()
            },
            PipelineMode::Default => BootstrapTools {
                compiler: Some(tool_or_default(
                    resolver,
                    settings.bootstrap_clang,
                    "clang",
                    ToolRole::CCompiler,
                )?),
                linker: Some(tool_or_default(
                    resolver,
                    settings.bootstrap_lld,
                    "ld.lld",
                    ToolRole::Linker,
                )?),
                ..BootstrapTools::default()
            },
            PipelineMode::Pgo => {
                let root = required_path(settings.default_clang, "default_clang", &cwd)?;
                resolver
                    .resolve(Some(&root), "clang", ToolRole::CCompiler)
                    .map_err(|e| {
                        BootstrapError::configuration(
                            format!("default_clang has no usable compiler: {}", e),
                            Some("--default-clang must be an install prefix containing bin/clang"),
                        )
                    })?;
                BootstrapTools {
                    default_toolchain: Some(root),
                    ..BootstrapTools::default()
                }
            }
        };

        let config = Self {
            mode,
            install_prefix,
            src_dir,
            build_root,
            cmake,
            ninja,
            bootstrap,
            options,
        };

        config.check_prerequisites(resolver)?;
        Ok(config)
    }

    /// Inputs that must already exist on disk for the selected entry point
    fn check_prerequisites(&self, resolver: &ToolResolver) -> BootstrapResult<()> {
        if let Some(ref suite) = self.options.llvm_test_suite_path {
            if self.mode == PipelineMode::Pgo && !suite.is_dir() {
                return Err(BootstrapError::configuration(
                    format!("Test suite directory does not exist: {}", suite.display()),
                    None,
                ));
            }
        }

        if self.mode == PipelineMode::Pgo && self.options.skip_pass1 {
            let merged = layout::merged_profile(&self.build_root);
            if !merged.is_file() && !resolver.is_planning() {
                return Err(BootstrapError::configuration(
                    format!(
                        "Resuming from pass2 needs a merged profile at {}",
                        merged.display()
                    ),
                    Some("Run without --skip-pass1 first to produce one"),
                ));
            }
        }

        Ok(())
    }

    /// Working directory for a named stage
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        layout::stage_dir(&self.build_root, stage)
    }
}

fn required_path(value: Option<PathBuf>, name: &str, cwd: &Path) -> BootstrapResult<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(absolutize(&path, cwd)),
        _ => {
            let help = format!(
                "Pass --{} or set '{}' in the config file",
                name.replace('_', "-"),
                name
            );
            Err(BootstrapError::configuration(
                format!("Missing required path '{}'", name),
                Some(&help),
            ))
        }
    }
}

fn tool_or_default(
    resolver: &ToolResolver,
    explicit: Option<PathBuf>,
    default_name: &str,
    role: ToolRole,
) -> BootstrapResult<ToolReference> {
    match explicit {
        Some(path) => resolver.explicit(&path, role),
        None => resolver.resolve(None, default_name, role),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::path::Path;

    /// A configuration with fixed tool paths, rooted at `root`
    pub fn configuration(mode: PipelineMode, root: &Path) -> Configuration {
        Configuration {
            mode,
            install_prefix: root.join("install"),
            src_dir: root.join("llvm-project").join("llvm"),
            build_root: root.join("build"),
            cmake: ToolReference::new("/usr/bin/cmake", ToolRole::Configure),
            ninja: ToolReference::new("/usr/bin/ninja", ToolRole::BuildDriver),
            bootstrap: match mode {
                PipelineMode::Bootstrap => BootstrapTools {
                    compiler: Some(ToolReference::new("/usr/bin/gcc", ToolRole::CCompiler)),
                    ..BootstrapTools::default()
                },
                PipelineMode::Default => BootstrapTools {
                    compiler: Some(ToolReference::new("/usr/bin/clang", ToolRole::CCompiler)),
                    linker: Some(ToolReference::new("/usr/bin/ld.lld", ToolRole::Linker)),
                    ..BootstrapTools::default()
                },
                PipelineMode::Pgo => BootstrapTools {
                    default_toolchain: Some(root.join("clang-default")),
                    ..BootstrapTools::default()
                },
            },
            options: BuildOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake_executable;
    use tempfile::TempDir;

    fn base_settings(root: &Path) -> Settings {
        std::fs::create_dir_all(root.join("src")).unwrap();
        let bin = root.join("host-bin");
        fake_executable(&bin, "cmake");
        fake_executable(&bin, "ninja");
        fake_executable(&bin, "gcc");
        fake_executable(&bin, "clang");
        fake_executable(&bin, "ld.lld");

        Settings {
            install_prefix: Some(root.join("install")),
            src_dir: Some(root.join("src")),
            build_dir: Some(root.join("build")),
            ..Settings::default()
        }
    }

    fn resolver(root: &Path) -> ToolResolver {
        ToolResolver::with_search_path(root.join("host-bin").as_os_str())
    }

    #[test]
    fn test_bootstrap_defaults_to_gcc_on_path() {
        let temp = TempDir::new().unwrap();
        let settings = base_settings(temp.path());

        let config =
            Configuration::resolve(PipelineMode::Bootstrap, settings, &resolver(temp.path()))
                .unwrap();

        let cc = config.bootstrap.compiler.unwrap();
        assert_eq!(cc.path, temp.path().join("host-bin").join("gcc"));
        assert_eq!(config.cmake.path, temp.path().join("host-bin").join("cmake"));
    }

    #[test]
    fn test_missing_required_path_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let mut settings = base_settings(temp.path());
        settings.install_prefix = None;

        let err = Configuration::resolve(PipelineMode::Bootstrap, settings, &resolver(temp.path()))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Configuration { ref reason, .. } if reason.contains("install_prefix")));
    }

    #[test]
    fn test_empty_required_path_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let mut settings = base_settings(temp.path());
        settings.build_dir = Some(PathBuf::new());

        assert!(
            Configuration::resolve(PipelineMode::Default, settings, &resolver(temp.path()))
                .is_err()
        );
    }

    #[test]
    fn test_missing_source_dir_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut settings = base_settings(temp.path());
        settings.src_dir = Some(temp.path().join("no-such-src"));

        let err = Configuration::resolve(PipelineMode::Default, settings, &resolver(temp.path()))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Configuration { .. }));
    }

    #[test]
    fn test_pgo_requires_default_clang_with_compiler() {
        let temp = TempDir::new().unwrap();
        let mut settings = base_settings(temp.path());

        let err = Configuration::resolve(
            PipelineMode::Pgo,
            settings.clone(),
            &resolver(temp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, BootstrapError::Configuration { .. }));

        let default_clang = temp.path().join("clang-17");
        settings.default_clang = Some(default_clang.clone());
        assert!(Configuration::resolve(
            PipelineMode::Pgo,
            settings.clone(),
            &resolver(temp.path())
        )
        .is_err());

        fake_executable(&default_clang.join("bin"), "clang");
        let config =
            Configuration::resolve(PipelineMode::Pgo, settings, &resolver(temp.path())).unwrap();
        assert_eq!(config.bootstrap.default_toolchain, Some(default_clang));
    }

    #[test]
    fn test_resume_requires_merged_profile() {
        let temp = TempDir::new().unwrap();
        let mut settings = base_settings(temp.path());
        let default_clang = temp.path().join("clang-17");
        fake_executable(&default_clang.join("bin"), "clang");
        settings.default_clang = Some(default_clang);
        settings.skip_pass1 = Some(true);

        let err = Configuration::resolve(
            PipelineMode::Pgo,
            settings.clone(),
            &resolver(temp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, BootstrapError::Configuration { ref reason, .. } if reason.contains("merged profile")));

        let merged = layout::merged_profile(&temp.path().join("build"));
        std::fs::create_dir_all(merged.parent().unwrap()).unwrap();
        std::fs::write(&merged, b"profdata").unwrap();

        let config =
            Configuration::resolve(PipelineMode::Pgo, settings, &resolver(temp.path())).unwrap();
        assert!(config.options.skip_pass1);
    }

    #[test]
    fn test_lto_and_channel_parse() {
        assert_eq!("thin".parse::<LtoMode>().unwrap(), LtoMode::Thin);
        assert_eq!("OFF".parse::<LtoMode>().unwrap().cmake_value(), None);
        assert_eq!("env".parse::<FlagChannel>().unwrap(), FlagChannel::Env);
        assert!("stdin".parse::<FlagChannel>().is_err());
    }
}
