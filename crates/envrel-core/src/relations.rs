//! Relation update for a single environment: group, tags, edge groups.
//!
//! The three fields are evaluated in that order. Anything that changed sets
//! one flag; only then is the environment written and the refresher called.
//! Errors abort at the first failure. Whether writes made before the failure
//! survive is up to the store: the redb transaction discards them, the
//! memory store keeps them.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::reconcile::{update_environment_edge_groups, update_environment_tags};
use crate::refresh::RelationRefresher;
use crate::store::RelationStore;
use crate::types::{EdgeGroupId, EnvironmentId, GroupId, TagId};

/// Partial update. `None` leaves a field alone; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsUpdate {
    /// `Some(GroupId(0))` is treated like `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_groups: Option<Vec<EdgeGroupId>>,
}

impl RelationsUpdate {
    pub fn is_empty(&self) -> bool {
        self.requested_group().is_none() && self.tags.is_none() && self.edge_groups.is_none()
    }

    fn requested_group(&self) -> Option<GroupId> {
        self.group.filter(|group| !group.is_unset())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub changed: bool,
    pub group_changed: bool,
    pub tags_changed: bool,
    pub edge_groups_changed: bool,
}

/// Apply `update` to one environment.
///
/// Returns an outcome with `changed == false` when nothing differed; in that
/// case the environment is not written and `refresher` is not called.
pub fn update_relations<S, R>(
    store: &mut S,
    refresher: &R,
    environment_id: EnvironmentId,
    update: &RelationsUpdate,
) -> Result<UpdateOutcome>
where
    S: RelationStore,
    R: RelationRefresher + ?Sized,
{
    let mut environment = store.environment(environment_id)?;
    let mut outcome = UpdateOutcome::default();

    if let Some(group) = update.requested_group() {
        outcome.group_changed = environment.group_id != group;
        environment.group_id = group;
    }

    if let Some(tags) = &update.tags {
        outcome.tags_changed =
            update_environment_tags(store, tags, &environment.tag_ids, environment.id)?;
        environment.tag_ids = tags.clone();
    }

    if let Some(edge_groups) = &update.edge_groups {
        outcome.edge_groups_changed =
            update_environment_edge_groups(store, edge_groups, environment.id)?;
    }

    outcome.changed =
        outcome.group_changed || outcome.tags_changed || outcome.edge_groups_changed;
    if !outcome.changed {
        return Ok(outcome);
    }

    store.update_environment(&environment)?;

    if let Err(e) = refresher.refresh(&environment) {
        warn!(environment = %environment.id, error = %e, "relation refresh failed");
        return Err(e);
    }

    info!(
        environment = %environment.id,
        group = outcome.group_changed,
        tags = outcome.tags_changed,
        edge_groups = outcome.edge_groups_changed,
        "environment relations updated"
    );
    Ok(outcome)
}
