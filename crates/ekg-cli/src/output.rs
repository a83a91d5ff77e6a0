//! Terminal output formatting.

use colored::Colorize;

use ekg_core::datasets::DataSets;
use ekg_core::header::SemanticHeader;
use ekg_core::perf::Performance;
use ekg_graph::GraphStats;

/// Print a summary of a parsed header/data structure pair.
pub fn print_header_summary(header: &SemanticHeader, datasets: &DataSets) {
    println!();
    println!(
        "{} {}",
        header.name.cyan().bold(),
        format!("(version {})", header.version).dimmed()
    );
    println!(
        "  {} entities ({} reified), {} relations, {} classes",
        header.entities.len(),
        header.entities.iter().filter(|e| e.is_reified()).count(),
        header.relations.len(),
        header.classes.len(),
    );

    for structure in &datasets.structures {
        println!(
            "  table {}: {} files, {} attributes{}",
            structure.name.bold(),
            structure.file_names.len(),
            structure.attributes.len(),
            if structure.is_event_data() {
                ""
            } else {
                " (static)"
            }
        );
    }
}

/// Print graph statistics as a table.
pub fn print_stats(stats: &GraphStats) {
    if stats.node_counts.is_empty() {
        println!("{}", "The graph is empty.".dimmed());
        return;
    }

    println!("{}", "Nodes".bold());
    print_counts(&stats.node_counts);

    if !stats.semantic_edge_counts.is_empty() {
        println!("\n{}", "Semantic edges".bold());
        print_counts(&stats.semantic_edge_counts);
    }
    if !stats.structural_edge_counts.is_empty() {
        println!("\n{}", "Structural edges".bold());
        print_counts(&stats.structural_edge_counts);
    }
}

fn print_counts(counts: &[(String, i64)]) {
    for (name, count) in counts {
        println!("  {:<24} {:>10}", name, count);
    }
}

/// Print per-step timings of a finished build.
pub fn print_performance(perf: &Performance) {
    if perf.steps().is_empty() {
        return;
    }

    println!("\n{}", "Timing".bold());
    for step in perf.steps() {
        println!("  {:<48} {:>8.2}s", step.name, step.duration);
    }
}
