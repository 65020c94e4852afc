//! Markdown rendering of a brief for display or download.

use crate::brief::models::{Brief, BriefSection};

pub fn render_markdown(brief: &Brief) -> String {
    let mut md = String::from("# Interview Prep Brief\n");

    if brief.partial {
        let missing = brief
            .missing_sections
            .iter()
            .map(BriefSection::title)
            .collect::<Vec<_>>()
            .join(", ");
        md.push_str(&format!("\n> Partial brief: could not recover {missing}.\n"));
    }

    for section in BriefSection::ALL {
        let items = brief.section(section);
        if items.is_empty() {
            continue;
        }
        md.push_str(&format!("\n## {}\n\n", section.title()));
        if section.is_prose() {
            md.push_str(&items.join("\n\n"));
            md.push('\n');
            continue;
        }
        for item in items {
            md.push_str("- ");
            md.push_str(item);
            md.push('\n');
        }
    }

    md
}
