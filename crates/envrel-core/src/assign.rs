//! Bulk assignment of a group, tags and edge groups to many environments.
//!
//! Environments that already carry a classification keep it unless the
//! matching override flag is set. Tags and edge groups named in the request
//! are created first and assigned alongside the existing ids.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::reconcile::environment_edge_groups;
use crate::refresh::RelationRefresher;
use crate::relations::{update_relations, RelationsUpdate, UpdateOutcome};
use crate::set::Set;
use crate::store::RelationStore;
use crate::types::{EdgeGroupId, Environment, EnvironmentId, GroupId, TagId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub edge_groups: Vec<EdgeGroupId>,
    /// Names of tags to create and assign.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub create_tags: Vec<String>,
    /// Names of edge groups to create and assign.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub create_edge_groups: Vec<String>,
    #[serde(default)]
    pub group: Option<GroupId>,
    #[serde(default)]
    pub override_tags: bool,
    #[serde(default)]
    pub override_edge_groups: bool,
    #[serde(default)]
    pub override_group: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignResult {
    pub environment_id: EnvironmentId,
    #[serde(flatten)]
    pub outcome: UpdateOutcome,
}

/// The update to send for one environment.
///
/// `edge_groups` is the environment's current edge group membership.
pub fn plan_update(
    environment: &Environment,
    edge_groups: &Set<EdgeGroupId>,
    request: &AssignRequest,
) -> RelationsUpdate {
    let mut update = RelationsUpdate::default();

    if environment.tag_ids.is_empty() || request.override_tags {
        update.tags = Some(request.tags.clone());
    }

    if edge_groups.is_empty() || request.override_edge_groups {
        update.edge_groups = Some(request.edge_groups.clone());
    }

    if let Some(group) = request.group.filter(|g| !g.is_unset()) {
        if environment.group_id == GroupId::UNASSIGNED || request.override_group {
            update.group = Some(group);
        }
    }

    update
}

/// Create the records `request` names and return it with their ids folded
/// into `tags` and `edge_groups`.
pub fn create_named<S: RelationStore>(
    store: &mut S,
    request: &AssignRequest,
) -> Result<AssignRequest> {
    let mut resolved = request.clone();
    for name in std::mem::take(&mut resolved.create_tags) {
        let tag = store.create_tag(&name)?;
        info!(tag = %tag.id, name = %tag.name, "tag created for assignment");
        resolved.tags.push(tag.id);
    }
    for name in std::mem::take(&mut resolved.create_edge_groups) {
        let edge_group = store.create_edge_group(&name)?;
        info!(
            edge_group = %edge_group.id,
            name = %edge_group.name,
            "edge group created for assignment"
        );
        resolved.edge_groups.push(edge_group.id);
    }
    Ok(resolved)
}

/// Create the named records, then plan and apply the request for each
/// environment in order.
///
/// Stops at the first failure; results for environments already processed
/// are dropped with it.
pub fn assign_environments<S, R>(
    store: &mut S,
    refresher: &R,
    environment_ids: &[EnvironmentId],
    request: &AssignRequest,
) -> Result<Vec<AssignResult>>
where
    S: RelationStore,
    R: RelationRefresher + ?Sized,
{
    let request = create_named(store, request)?;
    let mut results = Vec::with_capacity(environment_ids.len());
    for &environment_id in environment_ids {
        let environment = store.environment(environment_id)?;
        let edge_groups = environment_edge_groups(store, environment_id)?;
        let update = plan_update(&environment, &edge_groups, &request);
        debug!(environment = %environment_id, ?update, "planned assignment");

        let outcome = update_relations(store, refresher, environment_id, &update)?;
        results.push(AssignResult {
            environment_id,
            outcome,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::refresh::NoopRefresher;
    use crate::set::to_set;
    use crate::types::{EdgeGroup, Tag};

    fn environment(tags: &[u32], group: u32) -> Environment {
        Environment {
            id: EnvironmentId(1),
            name: "waiting".into(),
            group_id: GroupId(group),
            tag_ids: tags.iter().copied().map(TagId).collect(),
        }
    }

    fn request() -> AssignRequest {
        AssignRequest {
            tags: vec![TagId(5)],
            edge_groups: vec![EdgeGroupId(2)],
            group: Some(GroupId(3)),
            ..Default::default()
        }
    }

    #[test]
    fn fresh_environment_gets_everything() {
        let update = plan_update(&environment(&[], 1), &Set::new(), &request());
        assert_eq!(update.tags, Some(vec![TagId(5)]));
        assert_eq!(update.edge_groups, Some(vec![EdgeGroupId(2)]));
        assert_eq!(update.group, Some(GroupId(3)));
    }

    #[test]
    fn classified_environment_is_kept_without_overrides() {
        let update = plan_update(
            &environment(&[1], 4),
            &to_set(&[EdgeGroupId(1)]),
            &request(),
        );
        assert!(update.is_empty());
    }

    #[test]
    fn overrides_replace_existing_classification() {
        let req = AssignRequest {
            override_tags: true,
            override_edge_groups: true,
            override_group: true,
            ..request()
        };
        let update = plan_update(&environment(&[1], 4), &to_set(&[EdgeGroupId(1)]), &req);
        assert_eq!(update.tags, Some(vec![TagId(5)]));
        assert_eq!(update.edge_groups, Some(vec![EdgeGroupId(2)]));
        assert_eq!(update.group, Some(GroupId(3)));
    }

    #[test]
    fn no_requested_group_never_sets_group() {
        let req = AssignRequest {
            group: None,
            override_group: true,
            ..request()
        };
        let update = plan_update(&environment(&[], 1), &Set::new(), &req);
        assert!(update.group.is_none());
    }

    #[test]
    fn assigns_each_environment() {
        let mut store = MemoryStore::new();
        let mut tagged = Environment::new(EnvironmentId(2), "tagged");
        tagged.tag_ids = vec![TagId(1)];
        store.insert_environment(Environment::new(EnvironmentId(1), "fresh"));
        store.insert_environment(tagged);
        let mut tag1 = Tag::new(TagId(1), "old");
        tag1.endpoints.add(EnvironmentId(2));
        store.insert_tag(tag1);
        store.insert_tag(Tag::new(TagId(5), "new"));
        store.insert_edge_group(EdgeGroup::new(EdgeGroupId(2), "east"));

        let results = assign_environments(
            &mut store,
            &NoopRefresher,
            &[EnvironmentId(1), EnvironmentId(2)],
            &request(),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.outcome.changed));
        // environment 2 keeps its tag, only joins the edge group and group
        assert!(!results[1].outcome.tags_changed);
        assert_eq!(store.environment(EnvironmentId(2)).unwrap().tag_ids, vec![TagId(1)]);
        assert_eq!(
            store.tag(TagId(5)).unwrap().endpoints.sorted_keys(),
            vec![EnvironmentId(1)]
        );
        assert_eq!(
            store.edge_group(EdgeGroupId(2)).unwrap().endpoints,
            vec![EnvironmentId(1), EnvironmentId(2)]
        );
        assert_eq!(store.environment(EnvironmentId(1)).unwrap().group_id, GroupId(3));
    }

    #[test]
    fn stops_at_missing_environment() {
        let mut store = MemoryStore::new();
        store.insert_environment(Environment::new(EnvironmentId(1), "fresh"));
        let err = assign_environments(
            &mut store,
            &NoopRefresher,
            &[EnvironmentId(8), EnvironmentId(1)],
            &AssignRequest::default(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn named_records_are_created_and_assigned() {
        let mut store = MemoryStore::new();
        store.insert_environment(Environment::new(EnvironmentId(1), "fresh"));
        store.insert_tag(Tag::new(TagId(5), "existing"));
        let req = AssignRequest {
            tags: vec![TagId(5)],
            create_tags: vec!["rack-7".into()],
            create_edge_groups: vec!["east".into()],
            ..Default::default()
        };

        assign_environments(&mut store, &NoopRefresher, &[EnvironmentId(1)], &req).unwrap();

        let created = store.tag(TagId(6)).unwrap();
        assert_eq!(created.name, "rack-7");
        assert!(created.endpoints.contains(&EnvironmentId(1)));
        assert_eq!(
            store.environment(EnvironmentId(1)).unwrap().tag_ids,
            vec![TagId(5), TagId(6)]
        );
        assert_eq!(
            store.edge_group(EdgeGroupId(1)).unwrap().endpoints,
            vec![EnvironmentId(1)]
        );
    }

    #[test]
    fn request_payload_is_camel_case() {
        let req: AssignRequest = serde_json::from_str(
            r#"{"tags":[1],"edgeGroups":[2],"createTags":["new"],"overrideEdgeGroups":true}"#,
        )
        .unwrap();
        assert_eq!(req.edge_groups, vec![EdgeGroupId(2)]);
        assert_eq!(req.create_tags, vec!["new".to_string()]);
        assert!(req.override_edge_groups);
        assert!(!req.override_tags);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["overrideGroup"], false);
        assert!(json.get("createEdgeGroups").is_none());
    }
}
