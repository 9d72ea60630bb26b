use crate::output::{id_list, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

use super::open_db;

#[derive(Subcommand)]
pub enum EdgeGroupSubcommand {
    /// Create a static edge group
    Create { name: String },
    /// List edge groups with their members
    List,
}

pub fn run(root: &Path, subcmd: EdgeGroupSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EdgeGroupSubcommand::Create { name } => create(root, &name, json),
        EdgeGroupSubcommand::List => list(root, json),
    }
}

fn create(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let group = db
        .create_edge_group(name)
        .with_context(|| format!("failed to create edge group '{name}'"))?;

    if json {
        print_json(&group)?;
    } else {
        println!("Created edge group [{}]: {}", group.id, group.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let groups = db.edge_groups().context("failed to list edge groups")?;

    if json {
        return print_json(&groups);
    }
    if groups.is_empty() {
        println!("No edge groups.");
        return Ok(());
    }
    let rows = groups
        .iter()
        .map(|g| vec![g.id.to_string(), g.name.clone(), id_list(&g.endpoints)])
        .collect();
    print_table(&["ID", "NAME", "ENVIRONMENTS"], rows);
    Ok(())
}
