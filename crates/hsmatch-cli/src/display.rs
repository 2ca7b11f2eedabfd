//! Plain-text rendering of batch reports and reference lookups.

use std::fmt::Write;

use chrono::SecondsFormat;
use hsmatch_ai::BatchReport;
use hsmatch_core::{Hs10Entry, IsicConstraint, ItemStatus, LevelChoice, PathResult};

const MAX_CONSTRAINT_CODES: usize = 10;

// ── Public API ──

/// The report as a card: header, one block per item, then the final codes.
pub fn render_report(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Batch {} ===",
        report.requested_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if !report.constraint.code.is_empty() {
        let _ = writeln!(
            out,
            "ISIC {}: {} codes, headings [{}]",
            report.constraint.code,
            report.constraint.total.len(),
            report.constraint.hs04.join(", ")
        );
    }
    let _ = writeln!(out);

    if report.items.is_empty() {
        let _ = writeln!(out, "No items extracted.");
    }
    for (i, item) in report.items.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, item.item);
        if item.status == ItemStatus::TimedOut {
            let _ = writeln!(out, "    timed out");
            continue;
        }
        render_path(&mut out, &item.embedding);
        render_path(&mut out, &item.llm);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Final codes ({}):", report.final_codes.len());
    for code in &report.final_codes {
        let _ = writeln!(out, "  {code}");
    }
    out
}

/// Tariff lines under one heading, one per line.
pub fn render_leaves(four_digit: &str, lines: &[Hs10Entry]) -> String {
    let mut out = String::new();
    match lines.first() {
        None => {
            let _ = writeln!(out, "{four_digit}: no tariff lines");
        }
        Some(first) => {
            let _ = writeln!(out, "{four_digit}  {}", first.heading_label);
            for line in lines {
                let _ = writeln!(out, "  {}  {}", line.code, line.label);
            }
        }
    }
    out
}

pub fn render_constraint(constraint: &IsicConstraint) -> String {
    let mut out = String::new();
    if constraint.is_empty() {
        let _ = writeln!(out, "{}: no HS codes mapped", constraint.code);
        return out;
    }
    let _ = writeln!(out, "{}", constraint.code);
    let _ = writeln!(out, "  chapters: {}", constraint.hs02.join(", "));
    let _ = writeln!(out, "  headings: {}", constraint.hs04.join(", "));
    let shown: Vec<&str> = constraint
        .total
        .iter()
        .take(MAX_CONSTRAINT_CODES)
        .map(String::as_str)
        .collect();
    let more = constraint.total.len().saturating_sub(shown.len());
    let suffix = if more > 0 { format!(" (+{more} more)") } else { String::new() };
    let _ = writeln!(out, "  codes: {}{suffix}", shown.join(", "));
    out
}

// ── Helpers ──

fn render_path(out: &mut String, path: &PathResult) {
    let _ = writeln!(
        out,
        "    {:<4} {} > {} ({}) > {} ({}) > {}",
        path.kind.as_str(),
        choice(&path.section),
        choice(&path.chapter),
        path.hs02,
        choice(&path.heading),
        path.hs04.as_deref().unwrap_or("-"),
        choice(&path.leaf),
    );
    if !path.hs10.is_empty() {
        let _ = writeln!(out, "         codes: {}", path.hs10.join(", "));
    }
}

fn choice(c: &LevelChoice) -> String {
    if c.is_empty() {
        "-".to_string()
    } else {
        format!("{} [{:.3}]", c.label, c.confidence)
    }
}
