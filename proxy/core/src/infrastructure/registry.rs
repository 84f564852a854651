// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory application registry.
//!
//! Resources are sharded by namespace. Each shard sits behind its own
//! `parking_lot::RwLock`, so unrelated namespaces never contend and readers
//! only ever see fully applied writes. No `.await` happens while a shard lock
//! is held: a request cancelled mid-flight has either committed its mutation
//! or not started it.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::application::{ApplicationSpec, SparkApplication};
use crate::domain::identity::IdentityGenerator;
use crate::domain::lifecycle::TransitionRequest;
use crate::domain::repository::{ApplicationRegistry, RegistryError, TransitionOutcome};
use crate::domain::status::ApplicationRef;

#[derive(Default)]
struct NamespaceShard {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

struct Entry {
    /// Insertion sequence, gives `list` a stable order.
    seq: u64,
    application: SparkApplication,
}

impl NamespaceShard {
    fn find_mut(&mut self, target: &ApplicationRef) -> Option<&mut Entry> {
        match target {
            ApplicationRef::Name(name) => self.entries.get_mut(name),
            ApplicationRef::Id(id) => self
                .entries
                .values_mut()
                .find(|entry| &entry.application.id == id),
        }
    }
}

pub struct InMemoryApplicationRegistry {
    shards: DashMap<String, Arc<RwLock<NamespaceShard>>>,
    identity: Arc<dyn IdentityGenerator>,
}

impl InMemoryApplicationRegistry {
    pub fn new(identity: Arc<dyn IdentityGenerator>) -> Self {
        Self {
            shards: DashMap::new(),
            identity,
        }
    }

    fn shard(&self, namespace: &str) -> Option<Arc<RwLock<NamespaceShard>>> {
        self.shards.get(namespace).map(|shard| shard.value().clone())
    }

    fn shard_or_create(&self, namespace: &str) -> Arc<RwLock<NamespaceShard>> {
        self.shards
            .entry(namespace.to_string())
            .or_default()
            .value()
            .clone()
    }
}

#[async_trait]
impl ApplicationRegistry for InMemoryApplicationRegistry {
    async fn create(
        &self,
        namespace: &str,
        spec: ApplicationSpec,
    ) -> Result<SparkApplication, RegistryError> {
        let shard = self.shard_or_create(namespace);
        let mut shard = shard.write();

        if shard.entries.contains_key(&spec.name) {
            return Err(RegistryError::AlreadyExists {
                namespace: namespace.to_string(),
                name: spec.name,
            });
        }

        let id = self.identity.next_id()?;
        let application = SparkApplication::new(id, namespace, spec);
        let seq = shard.next_seq;
        shard.next_seq += 1;
        shard.entries.insert(
            application.spec.name.clone(),
            Entry {
                seq,
                application: application.clone(),
            },
        );

        debug!(namespace, name = %application.spec.name, id = %application.id, "Inserted application");
        Ok(application)
    }

    async fn list(&self, namespace: &str) -> Vec<SparkApplication> {
        let Some(shard) = self.shard(namespace) else {
            return Vec::new();
        };

        let mut entries: Vec<(u64, SparkApplication)> = shard
            .read()
            .entries
            .values()
            .map(|entry| (entry.seq, entry.application.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, application)| application).collect()
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<SparkApplication, RegistryError> {
        let shard = self
            .shard(namespace)
            .ok_or_else(|| RegistryError::not_found(namespace, name))?;
        let shard = shard.read();

        shard
            .entries
            .get(name)
            .map(|entry| entry.application.clone())
            .ok_or_else(|| RegistryError::not_found(namespace, name))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<SparkApplication, RegistryError> {
        let shard = self
            .shard(namespace)
            .ok_or_else(|| RegistryError::not_found(namespace, name))?;
        let removed = shard.write().entries.remove(name);

        match removed {
            Some(entry) => {
                debug!(namespace, name, id = %entry.application.id, "Removed application");
                Ok(entry.application)
            }
            None => Err(RegistryError::not_found(namespace, name)),
        }
    }

    async fn transition(
        &self,
        namespace: &str,
        target: &ApplicationRef,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, RegistryError> {
        let shard = self
            .shard(namespace)
            .ok_or_else(|| RegistryError::not_found(namespace, target))?;
        let mut shard = shard.write();

        let entry = shard
            .find_mut(target)
            .ok_or_else(|| RegistryError::not_found(namespace, target))?;
        let previous = entry.application.apply_transition(request)?;

        Ok(TransitionOutcome {
            previous,
            application: entry.application.clone(),
        })
    }
}
