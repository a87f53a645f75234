//! Colored run reporting.

use colored::Colorize;
use demoforge_engine::{ProvisionedResource, ResourceStatus, RunRecord};

pub fn print_run(record: &RunRecord) {
    println!(
        "{} {} ({})",
        "run".bold(),
        record.run_id,
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("schema {}", record.names.schema.bold());

    for count in &record.record_counts {
        println!("  {:<40} {:>6} rows", count.table, count.records);
    }
    if !record.relaxed_dimensions.is_empty() {
        println!(
            "{} overlap target relaxed for: {}",
            "note:".yellow(),
            record.relaxed_dimensions.join(", ")
        );
    }

    println!();
    for resource in &record.resources {
        println!("{}", format_resource(resource));
    }
}

fn format_resource(resource: &ProvisionedResource) -> String {
    let (marker, status) = match resource.status {
        ResourceStatus::Created => ("✓".green(), "created".green()),
        ResourceStatus::Failed => ("✗".red(), "failed".red()),
        ResourceStatus::Skipped => ("-".yellow(), "skipped".yellow()),
        ResourceStatus::Pending => ("…".normal(), "pending".normal()),
    };
    let detail = resource
        .detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();
    format!("  {marker} {:<45} {status}{detail}", resource.name)
}
