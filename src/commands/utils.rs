use crate::store::schema::{create_table, foreign_keys, indexes, primary_keys, REGISTRY_DDL};
use crate::wire::{CopyReader, Table};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Validate a staged binary COPY file
///
/// Files named like a staging buffer are also checked against that
/// table's field count.
pub fn validate_staged_file(file_path: &Path) -> Result<()> {
    println!("Validating COPY stream: {}", file_path.display());

    let file = File::open(file_path)
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    let mut reader = CopyReader::new(BufReader::new(file)).context("Invalid stream header")?;

    let table = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| Table::ALL.into_iter().find(|t| t.file_name() == name));

    let mut tuples = 0u64;
    let mut nulls = 0u64;
    while let Some(tuple) = reader
        .next_tuple()
        .with_context(|| format!("Invalid tuple {}", tuples + 1))?
    {
        if let Some(table) = table {
            if tuple.len() != table.field_count() as usize {
                anyhow::bail!(
                    "Tuple {} has {} fields, {} expects {}",
                    tuples + 1,
                    tuple.len(),
                    table,
                    table.field_count()
                );
            }
        }
        nulls += tuple.iter().filter(|field| field.is_none()).count() as u64;
        tuples += 1;
    }
    reader.finish().context("Invalid stream trailer")?;

    println!("✓ Valid COPY stream");
    if let Some(table) = table {
        println!("  Table: {}", table);
    }
    println!("  Tuples: {}", tuples);
    println!("  NULL fields: {}", nulls);

    Ok(())
}

/// Display the tables an export creates
pub fn display_schema(show_details: bool) {
    println!("pt-export schema");
    println!("Tables (copy order):");
    for table in Table::ALL {
        println!("  {:<14} {} columns", table.name(), table.field_count());
    }
    println!();

    if show_details {
        println!("{};", REGISTRY_DDL);
        println!();
        for table in Table::ALL {
            println!("{};", create_table(table));
        }
        println!();
        for statement in primary_keys(&Table::ALL)
            .into_iter()
            .chain(foreign_keys(&Table::ALL))
            .chain(indexes(&Table::ALL))
        {
            println!("{};", statement);
        }
    } else {
        println!("Use --show for the full DDL");
    }
}

/// Display version information
pub fn display_version() {
    println!("pt-export v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Loads decoded processor-trace samples into PostgreSQL.");
}
