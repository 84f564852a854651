// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Spark application proxy core.
//!
//! # Architecture
//!
//! - **domain:** aggregate, lifecycle rules, registry/backend/identity contracts
//! - **application:** use-case service and status reconciliation
//! - **infrastructure:** in-memory registry, identity generators, event bus,
//!   simulated execution backend
//! - **presentation:** HTTP/JSON API surface

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
