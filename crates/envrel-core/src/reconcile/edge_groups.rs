use tracing::debug;

use crate::error::Result;
use crate::set::{self, Set};
use crate::store::RelationStore;
use crate::types::{EdgeGroup, EdgeGroupId, EnvironmentId};

/// Ids of the groups in `edge_groups` that list `environment_id`.
pub fn member_edge_groups(
    edge_groups: &[EdgeGroup],
    environment_id: EnvironmentId,
) -> Set<EdgeGroupId> {
    edge_groups
        .iter()
        .filter(|group| group.has_member(environment_id))
        .map(|group| group.id)
        .collect()
}

/// Edge groups listing `environment_id` among their members.
///
/// Membership lives only on the edge groups, so this is a full scan.
pub fn environment_edge_groups<S: RelationStore>(
    store: &S,
    environment_id: EnvironmentId,
) -> Result<Set<EdgeGroupId>> {
    Ok(member_edge_groups(&store.edge_groups()?, environment_id))
}

/// Make `new_edge_groups` exactly the set of edge groups containing the environment.
///
/// The current membership is derived by scanning every edge group. Returns
/// `Ok(false)` after that scan when nothing has to move. The environment is
/// appended only to groups that do not list it yet, so no duplicate entries
/// are introduced.
pub fn update_environment_edge_groups<S: RelationStore>(
    store: &mut S,
    new_edge_groups: &[EdgeGroupId],
    environment_id: EnvironmentId,
) -> Result<bool> {
    let desired = set::to_set(new_edge_groups);
    let current = environment_edge_groups(store, environment_id)?;

    let Some((to_remove, to_add)) = super::membership_delta(&desired, &current) else {
        debug!(environment = %environment_id, "edge groups unchanged");
        return Ok(false);
    };

    debug!(
        environment = %environment_id,
        remove = to_remove.len(),
        add = to_add.len(),
        "reconciling edge groups"
    );

    for edge_group_id in to_remove {
        store.mutate_edge_group(edge_group_id, |group| {
            group.remove_member(environment_id);
        })?;
    }

    for edge_group_id in to_add {
        store.mutate_edge_group(edge_group_id, |group| {
            group.endpoints.push(environment_id);
        })?;
    }

    Ok(true)
}
