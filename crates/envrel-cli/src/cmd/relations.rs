use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::{Args, Subcommand};
use envrel_core::assign::AssignRequest;
use envrel_core::relations::{RelationsUpdate, UpdateOutcome};
use envrel_core::types::{EdgeGroupId, EnvironmentId, GroupId, TagId};
use std::path::Path;

use super::{open_db, refresher};

#[derive(Subcommand)]
pub enum RelationsSubcommand {
    /// Set the group, tags and edge groups of one environment
    Update {
        id: u32,
        #[command(flatten)]
        fields: UpdateFields,
    },
    /// Assign a group, tags and edge groups to many environments
    Assign {
        #[arg(required = true)]
        ids: Vec<u32>,
        /// Group to place unassigned environments in
        #[arg(long)]
        group: Option<u32>,
        /// Tags as comma-separated ids
        #[arg(long, value_delimiter = ',')]
        tags: Vec<u32>,
        /// Edge groups as comma-separated ids
        #[arg(long, value_delimiter = ',')]
        edge_groups: Vec<u32>,
        /// Tags to create by name and assign, comma-separated
        #[arg(long, value_delimiter = ',')]
        create_tags: Vec<String>,
        /// Edge groups to create by name and assign, comma-separated
        #[arg(long, value_delimiter = ',')]
        create_edge_groups: Vec<String>,
        /// Replace tags on environments that already have some
        #[arg(long)]
        override_tags: bool,
        /// Replace edge groups on environments already in one
        #[arg(long)]
        override_edge_groups: bool,
        /// Move environments that are already in a group
        #[arg(long)]
        override_group: bool,
    },
}

#[derive(Args)]
pub struct UpdateFields {
    /// New group id (0 leaves it unchanged)
    #[arg(long)]
    group: Option<u32>,
    /// Tags as comma-separated ids; replaces the current tags
    #[arg(long, value_delimiter = ',', conflicts_with = "clear_tags")]
    tags: Option<Vec<u32>>,
    /// Remove every tag
    #[arg(long)]
    clear_tags: bool,
    /// Edge groups as comma-separated ids; replaces the current membership
    #[arg(long, value_delimiter = ',', conflicts_with = "clear_edge_groups")]
    edge_groups: Option<Vec<u32>>,
    /// Leave every edge group
    #[arg(long)]
    clear_edge_groups: bool,
}

impl UpdateFields {
    fn into_update(self) -> RelationsUpdate {
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else {
            self.tags
        };
        let edge_groups = if self.clear_edge_groups {
            Some(Vec::new())
        } else {
            self.edge_groups
        };
        RelationsUpdate {
            group: self.group.map(GroupId),
            tags: tags.map(|ids| ids.into_iter().map(TagId).collect()),
            edge_groups: edge_groups.map(|ids| ids.into_iter().map(EdgeGroupId).collect()),
        }
    }
}

pub fn run(root: &Path, subcmd: RelationsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RelationsSubcommand::Update { id, fields } => {
            update(root, EnvironmentId(id), fields.into_update(), json)
        }
        RelationsSubcommand::Assign {
            ids,
            group,
            tags,
            edge_groups,
            create_tags,
            create_edge_groups,
            override_tags,
            override_edge_groups,
            override_group,
        } => {
            let request = AssignRequest {
                tags: tags.into_iter().map(TagId).collect(),
                edge_groups: edge_groups.into_iter().map(EdgeGroupId).collect(),
                create_tags,
                create_edge_groups,
                group: group.map(GroupId),
                override_tags,
                override_edge_groups,
                override_group,
            };
            let ids: Vec<EnvironmentId> = ids.into_iter().map(EnvironmentId).collect();
            assign(root, &ids, &request, json)
        }
    }
}

fn update(
    root: &Path,
    id: EnvironmentId,
    update: RelationsUpdate,
    json: bool,
) -> anyhow::Result<()> {
    let (config, db) = open_db(root)?;
    let refresher = refresher(root, &config);
    let outcome = db
        .update_relations(refresher.as_ref(), id, &update)
        .with_context(|| format!("failed to update relations of environment '{id}'"))?;

    if json {
        print_json(&serde_json::json!({
            "environment_id": id,
            "outcome": outcome,
        }))?;
    } else if outcome.changed {
        println!("Updated environment [{id}]: {}", describe(&outcome));
    } else {
        println!("Environment [{id}] unchanged");
    }
    Ok(())
}

fn assign(
    root: &Path,
    ids: &[EnvironmentId],
    request: &AssignRequest,
    json: bool,
) -> anyhow::Result<()> {
    let (config, db) = open_db(root)?;
    let refresher = refresher(root, &config);
    let results = db
        .assign(refresher.as_ref(), ids, request)
        .context("failed to assign environments")?;

    if json {
        return print_json(&results);
    }
    let rows = results
        .iter()
        .map(|r| {
            let status = if r.outcome.changed {
                describe(&r.outcome)
            } else {
                "unchanged".to_string()
            };
            vec![r.environment_id.to_string(), status]
        })
        .collect();
    print_table(&["ENVIRONMENT", "CHANGES"], rows);
    Ok(())
}

fn describe(outcome: &UpdateOutcome) -> String {
    let parts: Vec<&str> = [
        (outcome.group_changed, "group"),
        (outcome.tags_changed, "tags"),
        (outcome.edge_groups_changed, "edge groups"),
    ]
    .iter()
    .filter(|(changed, _)| *changed)
    .map(|(_, name)| *name)
    .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> UpdateFields {
        UpdateFields {
            group: None,
            tags: None,
            clear_tags: false,
            edge_groups: None,
            clear_edge_groups: false,
        }
    }

    #[test]
    fn omitted_flags_leave_fields_unset() {
        assert!(fields().into_update().is_empty());
    }

    #[test]
    fn clear_flags_send_empty_lists() {
        let update = UpdateFields {
            clear_tags: true,
            clear_edge_groups: true,
            ..fields()
        }
        .into_update();
        assert_eq!(update.tags, Some(Vec::new()));
        assert_eq!(update.edge_groups, Some(Vec::new()));
    }

    #[test]
    fn describe_lists_changed_parts() {
        let outcome = UpdateOutcome {
            changed: true,
            group_changed: true,
            tags_changed: false,
            edge_groups_changed: true,
        };
        assert_eq!(describe(&outcome), "group, edge groups");
    }
}
