// Copyright 2026 Profilescope Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command implementations behind the `profilescope` binary.

pub mod commands;
pub mod output;
