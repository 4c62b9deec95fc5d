use std::collections::BTreeMap;
use std::fmt::{Display, Write};

use crate::models::{EntryFilters, MetricsSnapshot};

fn scope_label(filters: &EntryFilters) -> String {
    let mut parts: Vec<String> = [
        filters.formation.map(|value| value.to_string()),
        filters.specialty.map(|value| value.to_string()),
        filters.contract_type.map(|value| value.to_string()),
        filters.participant_type.map(|value| value.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !filters.years_since_graduation.is_empty() {
        let years: Vec<String> = filters
            .years_since_graduation
            .iter()
            .map(|year| year.to_string())
            .collect();
        parts.push(format!("{} years since graduation", years.join("/")));
    }

    if parts.is_empty() {
        "all submissions".to_string()
    } else {
        parts.join(", ")
    }
}

fn write_map<K: Display, V: Display>(output: &mut String, title: &str, map: &BTreeMap<K, V>) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if map.is_empty() {
        let _ = writeln!(output, "No eligible submissions.");
    } else {
        for (group, value) in map {
            let _ = writeln!(output, "- {group}: {value}");
        }
    }
}

pub fn build_report(
    filters: &EntryFilters,
    snapshot: &MetricsSnapshot,
    recent_limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Salary Dashboard");
    let _ = writeln!(output, "Generated for {}", scope_label(filters));
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- Participants counted: {} ({} excluded, {} flagged)",
        snapshot.total_participants, snapshot.excluded_count, snapshot.flagged_count
    );
    let _ = writeln!(output, "- Average salary: {}", snapshot.average_salary);
    let _ = writeln!(output, "- Median salary: {}", snapshot.median_salary);

    write_map(&mut output, "Average by Formation", &snapshot.average_by_formation);
    write_map(&mut output, "Average by Specialty", &snapshot.average_by_specialty);
    write_map(&mut output, "Average by Contract", &snapshot.average_by_contract);
    write_map(&mut output, "Participants by Type", &snapshot.count_by_participant);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Salary Distribution");
    for bucket in &snapshot.salary_histogram {
        let _ = writeln!(output, "- {}: {}", bucket.label, bucket.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Specialty by Formation");
    if snapshot.specialty_by_formation.is_empty() {
        let _ = writeln!(output, "No eligible submissions.");
    } else {
        let _ = writeln!(output, "| Specialty | Formation | Average | Count |");
        let _ = writeln!(output, "|---|---|---|---|");
        for row in &snapshot.specialty_by_formation {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                row.specialty, row.formation, row.average_salary, row.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Submissions");
    if snapshot.recent_entries.is_empty() {
        let _ = writeln!(output, "No submissions yet.");
    } else {
        for entry in snapshot.recent_entries.iter().take(recent_limit) {
            let title = entry.job_title.as_deref().unwrap_or("untitled role");
            let _ = write!(
                output,
                "- {} {} {} {} ({}, {}) on {}: {}",
                entry.id,
                entry.formation,
                entry.specialty,
                entry.contract_type,
                entry.participant_type,
                title,
                entry.created_at.date_naive(),
                entry.salary
            );
            match &entry.outlier_reason {
                Some(reason) => {
                    let _ = writeln!(output, " [flagged: {reason}]");
                }
                None => {
                    let _ = writeln!(output);
                }
            }
        }
    }

    output
}
