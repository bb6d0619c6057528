//! Terminal rendering of a transaction run: the problem set from `check`
//! and the final element order from `order`, styled the way
//! `libretto-cli::output` renders its own tables and status lines
//! (comfy-table for tabular data, owo-colors for status coloring).

use std::collections::HashMap;

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use owo_colors::OwoColorize;
use rpmtx_core::{Problem, ProblemKind, Transaction};

pub fn print_problems(probs: &[Problem], names_by_key: &HashMap<u64, String>) {
    if probs.is_empty() {
        println!("{}", "no dependency problems found".green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["kind", "package", "dependency", "suggestions"]);

    for p in probs {
        let kind = match p.kind {
            ProblemKind::Missing => Cell::new("missing").fg(comfy_table::Color::Yellow),
            ProblemKind::Conflict => Cell::new("conflict").fg(comfy_table::Color::Red),
        };
        let suggestions = if p.suggestions.is_empty() {
            "-".to_string()
        } else {
            p.suggestions
                .iter()
                .map(|k| names_by_key.get(&k.0).cloned().unwrap_or_else(|| format!("#{}", k.0)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            kind,
            Cell::new(&p.nevr),
            Cell::new(&p.dnevr),
            Cell::new(suggestions).set_alignment(CellAlignment::Left),
        ]);
    }

    println!("{table}");
    eprintln!("{} {} problem(s) found", "!".red().bold(), probs.len());
}

pub fn print_order(ts: &Transaction) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "action", "package"]);

    for (i, te) in ts.order.iter().enumerate() {
        let action = if te.is_add() {
            Cell::new("install").fg(comfy_table::Color::Green)
        } else {
            Cell::new("erase").fg(comfy_table::Color::DarkGrey)
        };
        table.add_row(vec![Cell::new((i + 1).to_string()), action, Cell::new(&te.nevr)]);
    }

    println!("{table}");
}

pub fn print_order_failure(remaining: usize) {
    eprintln!(
        "{} transaction ordering failed: {remaining} element(s) could not be placed (unbreakable dependency loop)",
        "x".red().bold()
    );
}
