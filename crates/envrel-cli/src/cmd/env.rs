use crate::output::{id_list, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use envrel_core::types::{EnvironmentId, GroupId, TagId};
use std::path::Path;

use super::open_db;

#[derive(Subcommand)]
pub enum EnvSubcommand {
    /// Register an environment
    Create {
        name: String,
        /// Environment group (default: unassigned)
        #[arg(long)]
        group: Option<u32>,
        /// Initial tags as comma-separated ids (e.g. 1,3)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<u32>,
    },
    /// List environments
    List,
    /// Show one environment with its derived edge groups
    Show { id: u32 },
}

pub fn run(root: &Path, subcmd: EnvSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EnvSubcommand::Create { name, group, tags } => create(root, &name, group, &tags, json),
        EnvSubcommand::List => list(root, json),
        EnvSubcommand::Show { id } => show(root, EnvironmentId(id), json),
    }
}

fn create(
    root: &Path,
    name: &str,
    group: Option<u32>,
    tags: &[u32],
    json: bool,
) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let tags: Vec<TagId> = tags.iter().copied().map(TagId).collect();
    let env = db
        .create_environment(name, group.map(GroupId), &tags)
        .with_context(|| format!("failed to create environment '{name}'"))?;

    if json {
        print_json(&env)?;
    } else {
        println!("Created environment [{}]: {}", env.id, env.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let environments = db.environments().context("failed to list environments")?;

    if json {
        return print_json(&environments);
    }
    if environments.is_empty() {
        println!("No environments.");
        return Ok(());
    }
    let rows = environments
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.name.clone(),
                e.group_id.to_string(),
                id_list(&e.tag_ids),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "GROUP", "TAGS"], rows);
    Ok(())
}

fn show(root: &Path, id: EnvironmentId, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let env = db
        .environment(id)
        .with_context(|| format!("environment '{id}' not found"))?;
    let edge_groups = db
        .environment_edge_groups(id)
        .context("failed to scan edge groups")?
        .sorted_keys();

    if json {
        print_json(&serde_json::json!({
            "environment": env,
            "edge_groups": edge_groups,
        }))?;
    } else {
        println!("[{}] {}", env.id, env.name);
        println!("group:       {}", env.group_id);
        println!("tags:        {}", id_list(&env.tag_ids));
        println!("edge groups: {}", id_list(&edge_groups));
    }
    Ok(())
}
