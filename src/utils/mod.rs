// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Utility modules
//!
//! Common utilities for the clang-bootstrap CLI.

pub mod colors;

pub use colors::*;
