//! `spansync init`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use spansync_core::collection;

#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let path = collection::collection_path_at(home);
        let existed = path.exists();
        let collection = collection::init_at(home)
            .with_context(|| format!("failed to init collection at {}", path.display()))?;

        if existed {
            println!(
                "{} Collection already exists ({} records)",
                "✓".green(),
                collection.records.len()
            );
        } else {
            println!("{} Initialized collection", "✓".green());
        }
        println!("  Collection: {}", path.display());
        println!(
            "  Templates:  {}",
            collection::templates_dir_at(home).display()
        );
        for t in &collection.record_types {
            println!("    - {} ({})", t.name, t.fields.join(", "));
        }
        Ok(())
    }
}
