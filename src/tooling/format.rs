//! Format directory listings for the CLI.

use crate::snapshot::Snapshot;
use crate::types::ResourceRecord;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

/// Format a directory snapshot as a table.
pub fn format_directory_text(directory: &str, snapshot: &Snapshot) -> String {
    let mut out = format!("Directory: {} ({} rooms)\n\n", directory, snapshot.len());
    if snapshot.is_empty() {
        out.push_str("No rooms listed.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Room", "Name", "Alias", "Members", "Topic"]);
    for record in snapshot.records() {
        table.add_row(vec![
            record.id.to_string(),
            record.name.clone().unwrap_or_default(),
            record.canonical_alias.clone().unwrap_or_default(),
            record.joined_members.to_string(),
            record
                .topic
                .as_deref()
                .map(|topic| truncate_topic(topic, 60))
                .unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// Format a directory snapshot as JSON.
pub fn format_directory_json(
    directory: &str,
    snapshot: &Snapshot,
) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Listing<'a> {
        directory: &'a str,
        count: usize,
        rooms: Vec<&'a ResourceRecord>,
    }

    serde_json::to_string_pretty(&Listing {
        directory,
        count: snapshot.len(),
        rooms: snapshot.records().collect(),
    })
}

fn truncate_topic(topic: &str, max_chars: usize) -> String {
    let single_line = topic.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut short: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}
