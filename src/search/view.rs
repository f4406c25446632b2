use nu_ansi_term::Color;
use std::collections::BTreeMap;

use crate::store::ArchiveInfo;

/// Hits grouped by class name, one line per containing archive. Nested
/// archives name the archive they were found in.
pub fn render_hits(pattern: &str, hits: &[ArchiveInfo], color: bool) -> String {
    if hits.is_empty() {
        return format!("No classes matching '{pattern}'");
    }

    let mut by_class: BTreeMap<&str, Vec<&ArchiveInfo>> = BTreeMap::new();
    for hit in hits {
        by_class.entry(hit.class_name.as_str()).or_default().push(hit);
    }

    let paint = |c: Color, s: &str| {
        if color {
            c.paint(s).to_string()
        } else {
            s.to_string()
        }
    };

    let mut out = String::new();
    for (class_name, archives) in by_class {
        out.push_str(&paint(Color::Green, class_name));
        out.push('\n');
        for archive in archives {
            out.push_str("  ");
            out.push_str(&paint(Color::Yellow, &archive.filename));
            match (&archive.parent_filename, &archive.parent_path) {
                (Some(parent), Some(parent_path)) => {
                    out.push_str(&format!("  (inside {parent}: {parent_path})"));
                }
                _ => {
                    out.push_str("  ");
                    out.push_str(&archive.path);
                }
            }
            out.push('\n');
        }
    }

    let summary = format!("{} match(es) for '{pattern}'", hits.len());
    out.push_str(&paint(Color::LightGray, &summary));
    out
}
