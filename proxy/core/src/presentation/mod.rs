// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Presentation Layer - HTTP surface and wire contract

pub mod api;
pub mod translator;
pub mod wire;

pub use api::{app, app_with_layers, ApiError};
