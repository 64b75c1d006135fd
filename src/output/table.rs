use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::runner::Outcome;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Print the run outcome as a styled table to stdout.
pub fn print_outcome_table(outcome: &Outcome) {
    let table = Table::new(summary_rows(outcome))
        .with(Style::rounded())
        .to_string();
    println!("{}", table);
}

fn summary_rows(outcome: &Outcome) -> Vec<SummaryRow> {
    let status = match &outcome.published {
        Some(published) => match (&published.release_url, &published.tag_object_sha) {
            (Some(url), _) => format!("release {}", url).green().to_string(),
            (None, Some(sha)) => format!("tag object {}", sha).green().to_string(),
            (None, None) => "published".green().to_string(),
        },
        None => "dry run, not published".yellow().to_string(),
    };

    let mut rows = vec![
        row("Level", outcome.level.clone()),
        row("Previous", outcome.previous.dimmed().to_string()),
        row("Version", outcome.version.bold().to_string()),
        row("DNS form", outcome.version_dns.clone()),
        row("Mode", outcome.mode.as_str().to_string()),
        row("Status", status),
    ];

    if let Some(published) = &outcome.published {
        rows.push(row("Commit", published.target_sha.dimmed().to_string()));
    }

    rows
}

fn row(field: &str, value: String) -> SummaryRow {
    SummaryRow {
        field: field.to_string(),
        value,
    }
}
