//! `spansync diff <id>`: show unified diffs for what sync would write.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use spansync_core::RecordId;
use spansync_sync::diff::diff_record;

use super::{sync::resolver_for, sync_context, Prefer};
use crate::open_store;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Record to diff.
    pub id: RecordId,

    /// How incoherent peer groups would be settled.
    #[arg(long, value_enum, value_name = "SIDE", default_value = "download")]
    pub prefer: Prefer,
}

impl DiffArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let store = open_store(home)?;
        let mut ctx = sync_context(home);
        let mut resolver = resolver_for(Some(self.prefer));

        let result = diff_record(&mut ctx, &store, self.id, resolver.as_mut())
            .with_context(|| format!("diff failed for record {}", self.id))?;

        if result.diffs.is_empty() {
            println!("No differences for record {}.", result.id);
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
