use crate::output::{id_list, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

use super::open_db;

#[derive(Subcommand)]
pub enum TagSubcommand {
    /// Create a tag
    Create { name: String },
    /// List tags with the environments wearing them
    List,
}

pub fn run(root: &Path, subcmd: TagSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TagSubcommand::Create { name } => create(root, &name, json),
        TagSubcommand::List => list(root, json),
    }
}

fn create(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let tag = db
        .create_tag(name)
        .with_context(|| format!("failed to create tag '{name}'"))?;

    if json {
        print_json(&tag)?;
    } else {
        println!("Created tag [{}]: {}", tag.id, tag.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, db) = open_db(root)?;
    let tags = db.tags().context("failed to list tags")?;

    if json {
        return print_json(&tags);
    }
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }
    let rows = tags
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.name.clone(),
                id_list(&t.endpoints.sorted_keys()),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "ENVIRONMENTS"], rows);
    Ok(())
}
