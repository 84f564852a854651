// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: the Spark application aggregate and the contracts the other
//! layers implement or consume.

pub mod application;
pub mod backend;
pub mod config;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod repository;
pub mod status;
