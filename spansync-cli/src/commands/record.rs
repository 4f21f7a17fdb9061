//! `spansync record add|list|show`

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use spansync_core::scanner::{self, Marker};
use spansync_core::{Fragment, Record, RecordId, RecordStore, TypeName};

use crate::open_store;

/// Longest field preview shown by `record list`.
const PREVIEW_CHARS: usize = 40;

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// Add a record and print its id.
    Add(AddArgs),

    /// List every record.
    List(ListArgs),

    /// Print one record's fields and the markers they hold.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Record type, e.g. "Basic" or "Cloze".
    pub record_type: String,

    /// Field value as NAME=VALUE; repeatable. Unset fields stay empty.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: RecordId,
}

pub fn run(cmd: RecordCommand, home: &Path) -> Result<()> {
    match cmd {
        RecordCommand::Add(args) => add(args, home),
        RecordCommand::List(args) => list(args, home),
        RecordCommand::Show(args) => show(args, home),
    }
}

fn add(args: AddArgs, home: &Path) -> Result<()> {
    let mut store = open_store(home)?;
    let type_name = TypeName::from(args.record_type);
    let record_type = store
        .record_type(&type_name)
        .with_context(|| format!("cannot add a '{type_name}' record"))?;

    let mut values = vec![String::new(); record_type.fields.len()];
    for pair in &args.fields {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("expected NAME=VALUE, got '{pair}'");
        };
        let Some(idx) = record_type.field_index(name) else {
            bail!(
                "'{type_name}' has no field '{name}'; expected one of: {}",
                record_type.fields.join(", ")
            );
        };
        values[idx] = value.to_owned();
    }

    let id = store
        .add(&type_name, values)
        .with_context(|| format!("failed to add '{type_name}' record"))?;
    println!("{} Added record {} ({type_name})", "✓".green(), id.to_string().bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RecordJson<'a> {
    id: RecordId,
    record_type: &'a TypeName,
    fields: Vec<FieldJson<'a>>,
    updated_at: String,
}

#[derive(Serialize)]
struct FieldJson<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "id")]
    id: RecordId,
    #[tabled(rename = "type")]
    record_type: String,
    #[tabled(rename = "first field")]
    preview: String,
    #[tabled(rename = "markers")]
    markers: usize,
    #[tabled(rename = "updated")]
    updated: String,
}

fn list(args: ListArgs, home: &Path) -> Result<()> {
    let store = open_store(home)?;
    let memory = store.memory();
    let records = memory.records();

    if args.json {
        let payload: Vec<RecordJson<'_>> = records
            .iter()
            .map(|r| {
                let names = memory
                    .collection()
                    .record_type(&r.record_type)
                    .map(|t| t.fields.as_slice())
                    .unwrap_or_default();
                RecordJson {
                    id: r.id,
                    record_type: &r.record_type,
                    fields: r
                        .fields
                        .iter()
                        .enumerate()
                        .map(|(i, value)| FieldJson {
                            name: names.get(i).map(String::as_str).unwrap_or(""),
                            value,
                        })
                        .collect(),
                    updated_at: r.updated_at.to_rfc3339(),
                }
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize records JSON")?
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("No records.");
        println!("Run: spansync record add <Type> --field NAME=VALUE");
        return Ok(());
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            id: r.id,
            record_type: r.record_type.to_string(),
            preview: preview(r.field(0).unwrap_or("")),
            markers: count_markers(r),
            updated: r
                .updated_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn preview(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

fn count_markers(record: &Record) -> usize {
    record
        .fields
        .iter()
        .map(|value| scanner::markers(&Fragment::parse(value)).len())
        .sum()
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(args: ShowArgs, home: &Path) -> Result<()> {
    let store = open_store(home)?;
    let record = store
        .get(args.id)
        .with_context(|| format!("cannot show record {}", args.id))?;
    let names = store
        .record_type(&record.record_type)
        .map(|t| t.fields)
        .unwrap_or_default();

    println!(
        "{} {} ({})",
        "Record".bold(),
        record.id.to_string().bold(),
        record.record_type
    );
    for (idx, value) in record.fields.iter().enumerate() {
        let name = names.get(idx).map(String::as_str).unwrap_or("?");
        println!("{} {name}", format!("[{idx}]").bright_black());
        for line in value.lines() {
            println!("    {line}");
        }
        for (_, marker) in scanner::markers(&Fragment::parse(value)) {
            match marker {
                Marker::Dependency { note } => println!("    {} note={note}", "↳".cyan()),
                Marker::Peer { sid: Some(sid) } => println!("    {} sid={sid}", "⇄".cyan()),
                Marker::Peer { sid: None } => {
                    println!("    {} sid not assigned yet", "⇄".yellow())
                }
            }
        }
    }
    Ok(())
}
