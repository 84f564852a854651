// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod backend;
pub mod event_bus;
pub mod identity;
pub mod registry;

pub use backend::SimulatedBackend;
pub use event_bus::EventBus;
pub use identity::{identity_generator_for, SequentialIdentityGenerator, UuidIdentityGenerator};
pub use registry::InMemoryApplicationRegistry;
