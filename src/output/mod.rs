pub mod report;

use colored::Colorize;

use crate::pipeline::{Content, PageView, SectionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

pub fn render(view: &PageView, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(view),
        OutputFormat::Json => render_json(view),
        OutputFormat::Html => render_html(view),
    }
}

fn section_marker(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Suggested => "~",
        SectionKind::Favourites => "*",
        SectionKind::Group => "#",
    }
}

/// Terminal listing. Colors follow the global `colored` override.
pub fn render_text(view: &PageView) -> Vec<u8> {
    let mut out = String::new();
    match &view.content {
        Content::Error { message } => {
            out.push_str(&format!("{}\n", message.red().bold()));
        }
        Content::Empty { message } => {
            out.push_str(&format!("{}\n", message.dimmed()));
        }
        Content::Sections { sections } => {
            for s in sections {
                let fold = if s.open { "v" } else { ">" };
                out.push_str(&format!(
                    "{} {} {} ({})\n",
                    fold,
                    section_marker(s.kind),
                    s.title.bold(),
                    s.cards.len()
                ));
                for c in s.cards.iter() {
                    let star = if c.favourite {
                        "★".yellow().to_string()
                    } else {
                        "☆".dimmed().to_string()
                    };
                    let badge = c
                        .badge
                        .as_deref()
                        .map(|b| format!(" [{b}]"))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "  {} {}{}  {}\n",
                        star,
                        c.title.cyan(),
                        badge.dimmed(),
                        c.href.underline()
                    ));
                    if let Some(notes) = c.notes.as_deref() {
                        out.push_str(&format!("      {}\n", notes.dimmed()));
                    }
                    out.push_str(&format!("      id: {}\n", c.id.dimmed()));
                }
            }
        }
    }
    if !view.is_error() {
        out.push_str(&format!(
            "\n{} of {} items shown\n",
            view.total_shown, view.total_all
        ));
    }
    out.into_bytes()
}

pub fn render_json(view: &PageView) -> Vec<u8> {
    serde_json::to_vec_pretty(view).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_html(view: &PageView) -> Vec<u8> {
    report::render_html(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{build_view, error_view};
    use crate::store::Preferences;

    #[test]
    fn format_parse_and_inference() {
        assert_eq!(OutputFormat::parse("HTML"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::parse("xml"), None);
        assert_eq!(
            infer_format_from_path("out/hub.json"),
            Some(OutputFormat::Json)
        );
        assert_eq!(infer_format_from_path("hub"), None);
    }

    #[test]
    fn text_lists_cards_and_totals() {
        colored::control::set_override(false);
        let doc = crate::loader::parse_document(
            br#"{"groups":[{"title":"Docs","items":[{"id":"a","title":"API Guide","url":"https://x","notes":"reference"}]}]}"#,
            "test",
        )
        .unwrap();
        let view = build_view(&doc, "", &Preferences::default(), &Default::default());
        let text = String::from_utf8(render_text(&view)).unwrap();
        assert!(text.contains("> # Docs (1)"));
        assert!(text.contains("☆ API Guide  https://x"));
        assert!(text.contains("1 of 1 items shown"));
    }

    #[test]
    fn json_carries_state_tag() {
        let view = error_view(&Preferences::default());
        let json: serde_json::Value = serde_json::from_slice(&render_json(&view)).unwrap();
        assert_eq!(json["content"]["state"], "error");
        assert_eq!(json["content"]["message"], "Failed to load data.");
    }
}
