// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Build root directory layout

use std::path::{Path, PathBuf};

pub const STAGE1: &str = "stage1";
pub const STAGE2: &str = "stage2";
pub const DEFAULT_STAGE: &str = "default";
pub const PASS1: &str = "pass1";
pub const PASS2: &str = "pass2";
pub const TEST_SUITE: &str = "test_suite";
pub const MERGE: &str = "merge";

/// Subdirectory of pass1 the instrumented compiler writes raw profiles into
pub const PROFILE_DIR: &str = "profiles";
/// Extension of raw profile files
pub const RAW_PROFILE_EXT: &str = "profraw";
/// File name of the merged profile inside pass2
pub const MERGED_PROFILE: &str = "default.profdata";

pub fn stage_dir(build_root: &Path, stage: &str) -> PathBuf {
    build_root.join(stage)
}

pub fn raw_profile_dir(build_root: &Path) -> PathBuf {
    stage_dir(build_root, PASS1).join(PROFILE_DIR)
}

pub fn merged_profile(build_root: &Path) -> PathBuf {
    stage_dir(build_root, PASS2).join(MERGED_PROFILE)
}
