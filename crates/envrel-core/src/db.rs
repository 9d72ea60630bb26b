//! Persistent relation storage using redb.
//!
//! # Table design
//!
//! One table per record type, keyed by the record's `u32` id with the record
//! JSON-encoded as the value:
//! ```text
//! environments: EnvironmentId -> Environment
//! tags:         TagId         -> Tag
//! edge_groups:  EdgeGroupId   -> EdgeGroup
//! ```
//!
//! New ids are the table's last key plus one. Every mutation goes through
//! [`RelationsDb::transaction`], so a relation update either lands completely
//! or not at all. Refreshes requested during a relation update are queued
//! and only run once the transaction has committed.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assign::{assign_environments, AssignRequest, AssignResult};
use crate::error::{EntityKind, RelationsError, Result};
use crate::reconcile::member_edge_groups;
use crate::refresh::{RefreshQueue, RelationRefresher};
use crate::relations::{update_relations, RelationsUpdate, UpdateOutcome};
use crate::set::Set;
use crate::store::RelationStore;
use crate::types::{EdgeGroup, EdgeGroupId, Environment, EnvironmentId, GroupId, Tag, TagId};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

type Records = TableDefinition<'static, u32, &'static [u8]>;

const ENVIRONMENTS: Records = TableDefinition::new("environments");
const TAGS: Records = TableDefinition::new("tags");
const EDGE_GROUPS: Records = TableDefinition::new("edge_groups");

fn db_err(e: impl std::fmt::Display) -> RelationsError {
    RelationsError::Persistence(e.to_string())
}

// ---------------------------------------------------------------------------
// Record helpers shared by read and write transactions
// ---------------------------------------------------------------------------

fn get_record<T, R>(table: &R, kind: EntityKind, id: u32) -> Result<T>
where
    T: DeserializeOwned,
    R: ReadableTable<u32, &'static [u8]>,
{
    let guard = table
        .get(id)
        .map_err(db_err)?
        .ok_or_else(|| RelationsError::not_found(kind, id))?;
    let record = serde_json::from_slice(guard.value()).map_err(db_err)?;
    Ok(record)
}

fn all_records<T, R>(table: &R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u32, &'static [u8]>,
{
    let mut result = Vec::new();
    for entry in table.iter().map_err(db_err)? {
        let (_, v) = entry.map_err(db_err)?;
        result.push(serde_json::from_slice(v.value()).map_err(db_err)?);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// RelationsDb
// ---------------------------------------------------------------------------

pub struct RelationsDb {
    db: Database,
}

impl RelationsDb {
    /// Open or create the redb database at `path`, creating missing tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        for table in [ENVIRONMENTS, TAGS, EDGE_GROUPS] {
            wt.open_table(table).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    /// Run `f` in one write transaction: commit on `Ok`, abort on `Err`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DbTx<'_>) -> Result<T>,
    {
        let wt = self.db.begin_write().map_err(db_err)?;
        let result = {
            let mut tx = DbTx { txn: &wt };
            f(&mut tx)
        };
        match result {
            Ok(value) => {
                wt.commit().map_err(db_err)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = wt.abort() {
                    warn!(error = %abort, "failed to abort transaction");
                }
                debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    /// Apply a relation update atomically, then refresh.
    ///
    /// The refresher runs only after commit. A refresh failure is returned as
    /// [`RelationsError::Refresh`] and the committed writes stay.
    pub fn update_relations<R>(
        &self,
        refresher: &R,
        environment_id: EnvironmentId,
        update: &RelationsUpdate,
    ) -> Result<UpdateOutcome>
    where
        R: RelationRefresher + ?Sized,
    {
        let queue = RefreshQueue::new();
        let outcome =
            self.transaction(|tx| update_relations(tx, &queue, environment_id, update))?;
        queue.flush(refresher)?;
        Ok(outcome)
    }

    /// Bulk assignment as a single transaction. Every changed environment is
    /// refreshed after the whole batch has committed.
    pub fn assign<R>(
        &self,
        refresher: &R,
        environment_ids: &[EnvironmentId],
        request: &AssignRequest,
    ) -> Result<Vec<AssignResult>>
    where
        R: RelationRefresher + ?Sized,
    {
        let queue = RefreshQueue::new();
        let results =
            self.transaction(|tx| assign_environments(tx, &queue, environment_ids, request))?;
        queue.flush(refresher)?;
        Ok(results)
    }

    pub fn create_environment(
        &self,
        name: &str,
        group: Option<GroupId>,
        tags: &[TagId],
    ) -> Result<Environment> {
        self.transaction(|tx| tx.create_environment(name, group, tags))
    }

    pub fn create_tag(&self, name: &str) -> Result<Tag> {
        self.transaction(|tx| tx.create_tag(name))
    }

    pub fn create_edge_group(&self, name: &str) -> Result<EdgeGroup> {
        self.transaction(|tx| tx.create_edge_group(name))
    }

    pub fn environment(&self, id: EnvironmentId) -> Result<Environment> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ENVIRONMENTS).map_err(db_err)?;
        get_record(&table, EntityKind::Environment, id.0)
    }

    pub fn tag(&self, id: TagId) -> Result<Tag> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(TAGS).map_err(db_err)?;
        get_record(&table, EntityKind::Tag, id.0)
    }

    pub fn edge_group(&self, id: EdgeGroupId) -> Result<EdgeGroup> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(EDGE_GROUPS).map_err(db_err)?;
        get_record(&table, EntityKind::EdgeGroup, id.0)
    }

    pub fn environments(&self) -> Result<Vec<Environment>> {
        self.list(ENVIRONMENTS)
    }

    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.list(TAGS)
    }

    pub fn edge_groups(&self) -> Result<Vec<EdgeGroup>> {
        self.list(EDGE_GROUPS)
    }

    /// Edge groups the environment belongs to, found by scanning them all.
    pub fn environment_edge_groups(&self, id: EnvironmentId) -> Result<Set<EdgeGroupId>> {
        Ok(member_edge_groups(&self.edge_groups()?, id))
    }

    fn list<T: DeserializeOwned>(&self, definition: Records) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(definition).map_err(db_err)?;
        all_records(&table)
    }
}

// ---------------------------------------------------------------------------
// DbTx
// ---------------------------------------------------------------------------

/// Store access inside an open write transaction.
pub struct DbTx<'txn> {
    txn: &'txn WriteTransaction,
}

impl DbTx<'_> {
    fn get<T: DeserializeOwned>(&self, definition: Records, kind: EntityKind, id: u32) -> Result<T> {
        let table = self.txn.open_table(definition).map_err(db_err)?;
        get_record(&table, kind, id)
    }

    fn put<T: Serialize>(&self, definition: Records, id: u32, record: &T) -> Result<()> {
        let value = serde_json::to_vec(record).map_err(db_err)?;
        let mut table = self.txn.open_table(definition).map_err(db_err)?;
        table.insert(id, value.as_slice()).map_err(db_err)?;
        Ok(())
    }

    /// Overwrite an existing record. Missing records are `NotFound`.
    fn replace<T: Serialize>(
        &self,
        definition: Records,
        kind: EntityKind,
        id: u32,
        record: &T,
    ) -> Result<()> {
        {
            let table = self.txn.open_table(definition).map_err(db_err)?;
            if table.get(id).map_err(db_err)?.is_none() {
                return Err(RelationsError::not_found(kind, id));
            }
        }
        self.put(definition, id, record)
    }

    fn next_id(&self, definition: Records) -> Result<u32> {
        let table = self.txn.open_table(definition).map_err(db_err)?;
        let last = table
            .last()
            .map_err(db_err)?
            .map(|(k, _)| k.value())
            .unwrap_or(0);
        last.checked_add(1)
            .ok_or_else(|| RelationsError::Persistence("id space exhausted".into()))
    }

    /// Insert a new environment wearing `tags`, keeping each tag's index in step.
    pub fn create_environment(
        &mut self,
        name: &str,
        group: Option<GroupId>,
        tags: &[TagId],
    ) -> Result<Environment> {
        let id = EnvironmentId(self.next_id(ENVIRONMENTS)?);
        let mut environment = Environment::new(id, name);
        if let Some(group) = group.filter(|g| !g.is_unset()) {
            environment.group_id = group;
        }
        for &tag_id in tags {
            self.mutate_tag(tag_id, |tag| tag.endpoints.add(id))?;
            if !environment.tag_ids.contains(&tag_id) {
                environment.tag_ids.push(tag_id);
            }
        }
        self.put(ENVIRONMENTS, id.0, &environment)?;
        info!(environment = %id, name, "environment created");
        Ok(environment)
    }
}

impl RelationStore for DbTx<'_> {
    fn environment(&self, id: EnvironmentId) -> Result<Environment> {
        self.get(ENVIRONMENTS, EntityKind::Environment, id.0)
    }

    fn update_environment(&mut self, environment: &Environment) -> Result<()> {
        self.replace(
            ENVIRONMENTS,
            EntityKind::Environment,
            environment.id.0,
            environment,
        )
    }

    fn tag(&self, id: TagId) -> Result<Tag> {
        self.get(TAGS, EntityKind::Tag, id.0)
    }

    fn update_tag(&mut self, tag: &Tag) -> Result<()> {
        self.replace(TAGS, EntityKind::Tag, tag.id.0, tag)
    }

    fn edge_group(&self, id: EdgeGroupId) -> Result<EdgeGroup> {
        self.get(EDGE_GROUPS, EntityKind::EdgeGroup, id.0)
    }

    fn edge_groups(&self) -> Result<Vec<EdgeGroup>> {
        let table = self.txn.open_table(EDGE_GROUPS).map_err(db_err)?;
        all_records(&table)
    }

    fn update_edge_group(&mut self, edge_group: &EdgeGroup) -> Result<()> {
        self.replace(
            EDGE_GROUPS,
            EntityKind::EdgeGroup,
            edge_group.id.0,
            edge_group,
        )
    }

    fn create_tag(&mut self, name: &str) -> Result<Tag> {
        let tag = Tag::new(TagId(self.next_id(TAGS)?), name);
        self.put(TAGS, tag.id.0, &tag)?;
        info!(tag = %tag.id, name, "tag created");
        Ok(tag)
    }

    fn create_edge_group(&mut self, name: &str) -> Result<EdgeGroup> {
        let group = EdgeGroup::new(EdgeGroupId(self.next_id(EDGE_GROUPS)?), name);
        self.put(EDGE_GROUPS, group.id.0, &group)?;
        info!(edge_group = %group.id, name, "edge group created");
        Ok(group)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
