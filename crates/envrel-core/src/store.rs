//! Store capability the reconcilers run against.
//!
//! Implemented by [`crate::memory::MemoryStore`] and by the redb write
//! transaction handle [`crate::db::DbTx`]. Which one the caller passes decides
//! whether a relation update is atomic across records.

use crate::error::Result;
use crate::types::{EdgeGroup, EdgeGroupId, Environment, EnvironmentId, Tag, TagId};

pub trait RelationStore {
    fn environment(&self, id: EnvironmentId) -> Result<Environment>;

    fn update_environment(&mut self, environment: &Environment) -> Result<()>;

    fn tag(&self, id: TagId) -> Result<Tag>;

    fn update_tag(&mut self, tag: &Tag) -> Result<()>;

    fn edge_group(&self, id: EdgeGroupId) -> Result<EdgeGroup>;

    /// All edge groups, ascending by id.
    fn edge_groups(&self) -> Result<Vec<EdgeGroup>>;

    fn update_edge_group(&mut self, edge_group: &EdgeGroup) -> Result<()>;

    /// Insert a tag with the next free id and no members.
    fn create_tag(&mut self, name: &str) -> Result<Tag>;

    /// Insert an edge group with the next free id and no members.
    fn create_edge_group(&mut self, name: &str) -> Result<EdgeGroup>;

    /// Load a tag, apply `mutate`, write it back.
    fn mutate_tag<F>(&mut self, id: TagId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Tag),
    {
        let mut tag = self.tag(id)?;
        mutate(&mut tag);
        self.update_tag(&tag)
    }

    /// Load an edge group, apply `mutate`, write it back.
    fn mutate_edge_group<F>(&mut self, id: EdgeGroupId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut EdgeGroup),
    {
        let mut edge_group = self.edge_group(id)?;
        mutate(&mut edge_group);
        self.update_edge_group(&edge_group)
    }
}
