//! Unit catalog listing.

use std::path::PathBuf;

use clap::Args;
use patchwire_catalog::{PropertySpec, UnitCategory, UnitSpec, quirks};

use super::common;

const CATEGORIES: [UnitCategory; 5] = [
    UnitCategory::Source,
    UnitCategory::Effect,
    UnitCategory::Analysis,
    UnitCategory::Output,
    UnitCategory::Control,
];

#[derive(Args)]
pub struct CatalogArgs {
    /// Show details for a single unit type
    #[arg(value_name = "TYPE")]
    unit: Option<String>,

    /// Print as JSON
    #[arg(long)]
    json: bool,

    /// Merge extra unit definitions from a JSON file
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
}

pub fn run(args: &CatalogArgs) -> anyhow::Result<()> {
    let catalog = common::load_catalog(args.catalog.as_deref())?;

    let Some(name) = &args.unit else {
        if args.json {
            println!("{}", catalog.to_json()?);
        } else {
            list(&catalog);
        }
        return Ok(());
    };

    let unit = catalog
        .all_units()
        .iter()
        .find(|u| u.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow::anyhow!("Unknown unit type: {name}"))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(unit)?);
    } else {
        describe(unit);
    }
    Ok(())
}

fn list(catalog: &patchwire_core::Catalog) {
    println!("Available Units");
    println!("===============");
    for category in CATEGORIES {
        let units = catalog.units_in_category(category);
        if units.is_empty() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for unit in units {
            println!("  {:18}  {}", unit.name, unit.description);
        }
    }
    println!();
    println!("Use 'patchwire catalog <TYPE>' for ports and properties.");
}

fn describe(unit: &UnitSpec) {
    println!("{}", unit.name);
    println!("{}", "=".repeat(unit.name.len()));
    if !unit.description.is_empty() {
        println!();
        println!("{}", unit.description);
    }

    println!();
    println!("Category: {}", unit.category.name());
    if !unit.methods.is_empty() {
        println!("Methods:  {}", unit.methods.join(", "));
    }

    for (title, ports) in [("Inputs", &unit.inputs), ("Outputs", &unit.outputs)] {
        if ports.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for port in ports {
            println!("  {:18}  {:?}", port.name, port.kind);
        }
    }

    if !unit.properties.is_empty() {
        println!();
        println!("Properties:");
        println!("  {:18}  {:8}  {:10}  {}", "Name", "Kind", "Default", "Range");
        println!("  {:18}  {:8}  {:10}  {}", "----", "----", "-------", "-----");
        for prop in &unit.properties {
            let marker = if quirks::requires_recreation(&unit.name, &prop.name) {
                " (rebuilds unit)"
            } else {
                ""
            };
            println!(
                "  {:18}  {:8}  {:10}  {}{marker}",
                prop.name,
                format!("{:?}", prop.kind).to_lowercase(),
                prop.default.to_string(),
                range(prop)
            );
        }
    }

    let targets = quirks::modulation_targets(&unit.name);
    if !targets.is_empty() {
        println!();
        println!("Modulation targets: {}", targets.join(", "));
    }
}

fn range(prop: &PropertySpec) -> String {
    if !prop.options.is_empty() {
        return prop.options.join(" | ");
    }
    match (prop.min, prop.max) {
        (Some(min), Some(max)) => format!("{min} .. {max}"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => String::new(),
    }
}
