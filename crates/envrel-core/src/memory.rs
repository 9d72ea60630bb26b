//! In-process [`RelationStore`] with call accounting.
//!
//! Writes land immediately and are never rolled back, so a failure midway
//! through a relation update leaves the earlier writes in place.

use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};

use crate::error::{EntityKind, RelationsError, Result};
use crate::store::RelationStore;
use crate::types::{EdgeGroup, EdgeGroupId, Environment, EnvironmentId, Tag, TagId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub reads: usize,
    pub writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    environments: BTreeMap<EnvironmentId, Environment>,
    tags: BTreeMap<TagId, Tag>,
    edge_groups: BTreeMap<EdgeGroupId, EdgeGroup>,
    failing_reads: HashSet<(EntityKind, u32)>,
    failing_writes: HashSet<(EntityKind, u32)>,
    failing_scan: bool,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a store call.
    pub fn insert_environment(&mut self, environment: Environment) {
        self.environments.insert(environment.id, environment);
    }

    pub fn insert_tag(&mut self, tag: Tag) {
        self.tags.insert(tag.id, tag);
    }

    pub fn insert_edge_group(&mut self, edge_group: EdgeGroup) {
        self.edge_groups.insert(edge_group.id, edge_group);
    }

    /// Make every later read of this record fail with a persistence error.
    pub fn fail_reads_to(&mut self, kind: EntityKind, id: impl Into<u32>) {
        self.failing_reads.insert((kind, id.into()));
    }

    /// Make every later `edge_groups()` scan fail with a persistence error.
    pub fn fail_edge_group_scan(&mut self) {
        self.failing_scan = true;
    }

    /// Make every later write to this record fail with a persistence error.
    pub fn fail_writes_to(&mut self, kind: EntityKind, id: impl Into<u32>) {
        self.failing_writes.insert((kind, id.into()));
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.get(),
            writes: self.writes.get(),
        }
    }

    pub fn reset_stats(&self) {
        self.reads.set(0);
        self.writes.set(0);
    }

    fn check_read(&self, kind: EntityKind, id: u32) -> Result<()> {
        self.reads.set(self.reads.get() + 1);
        if self.failing_reads.contains(&(kind, id)) {
            return Err(RelationsError::Persistence(format!(
                "read of {kind} {id} rejected"
            )));
        }
        Ok(())
    }

    fn check_write(&self, kind: EntityKind, id: u32) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        if self.failing_writes.contains(&(kind, id)) {
            return Err(RelationsError::Persistence(format!(
                "write to {kind} {id} rejected"
            )));
        }
        Ok(())
    }
}

impl RelationStore for MemoryStore {
    fn environment(&self, id: EnvironmentId) -> Result<Environment> {
        self.check_read(EntityKind::Environment, id.0)?;
        self.environments
            .get(&id)
            .cloned()
            .ok_or_else(|| RelationsError::not_found(EntityKind::Environment, id))
    }

    fn update_environment(&mut self, environment: &Environment) -> Result<()> {
        self.check_write(EntityKind::Environment, environment.id.0)?;
        let slot = self
            .environments
            .get_mut(&environment.id)
            .ok_or_else(|| RelationsError::not_found(EntityKind::Environment, environment.id))?;
        *slot = environment.clone();
        Ok(())
    }

    fn tag(&self, id: TagId) -> Result<Tag> {
        self.check_read(EntityKind::Tag, id.0)?;
        self.tags
            .get(&id)
            .cloned()
            .ok_or_else(|| RelationsError::not_found(EntityKind::Tag, id))
    }

    fn update_tag(&mut self, tag: &Tag) -> Result<()> {
        self.check_write(EntityKind::Tag, tag.id.0)?;
        let slot = self
            .tags
            .get_mut(&tag.id)
            .ok_or_else(|| RelationsError::not_found(EntityKind::Tag, tag.id))?;
        *slot = tag.clone();
        Ok(())
    }

    fn edge_group(&self, id: EdgeGroupId) -> Result<EdgeGroup> {
        self.check_read(EntityKind::EdgeGroup, id.0)?;
        self.edge_groups
            .get(&id)
            .cloned()
            .ok_or_else(|| RelationsError::not_found(EntityKind::EdgeGroup, id))
    }

    fn edge_groups(&self) -> Result<Vec<EdgeGroup>> {
        self.reads.set(self.reads.get() + 1);
        if self.failing_scan {
            return Err(RelationsError::Persistence(
                "edge group scan rejected".to_string(),
            ));
        }
        Ok(self.edge_groups.values().cloned().collect())
    }

    fn update_edge_group(&mut self, edge_group: &EdgeGroup) -> Result<()> {
        self.check_write(EntityKind::EdgeGroup, edge_group.id.0)?;
        let slot = self
            .edge_groups
            .get_mut(&edge_group.id)
            .ok_or_else(|| RelationsError::not_found(EntityKind::EdgeGroup, edge_group.id))?;
        *slot = edge_group.clone();
        Ok(())
    }

    fn create_tag(&mut self, name: &str) -> Result<Tag> {
        self.writes.set(self.writes.get() + 1);
        let id = TagId(next_id(self.tags.keys().next_back().map(|id| id.0))?);
        let tag = Tag::new(id, name);
        self.tags.insert(id, tag.clone());
        Ok(tag)
    }

    fn create_edge_group(&mut self, name: &str) -> Result<EdgeGroup> {
        self.writes.set(self.writes.get() + 1);
        let id = EdgeGroupId(next_id(self.edge_groups.keys().next_back().map(|id| id.0))?);
        let edge_group = EdgeGroup::new(id, name);
        self.edge_groups.insert(id, edge_group.clone());
        Ok(edge_group)
    }
}

fn next_id(last: Option<u32>) -> Result<u32> {
    last.unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| RelationsError::Persistence("id space exhausted".into()))
}
