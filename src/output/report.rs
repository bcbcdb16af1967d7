use crate::pipeline::{CardView, Content, PageView, SectionView};
use crate::utils::{escape_html, highlight};

fn pressed(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn render_card(card: &CardView, query: &str) -> String {
    let vis_class = card.badge.as_deref().unwrap_or("untagged");
    let badge = card
        .badge
        .as_deref()
        .map(|b| {
            format!(
                r#"<div class="badge {cls}">{label}</div>"#,
                cls = escape_html(b),
                label = escape_html(b)
            )
        })
        .unwrap_or_default();
    let notes = card
        .notes
        .as_deref()
        .map(|n| format!(r#"<div class="cardNotes">{}</div>"#, highlight(n, query)))
        .unwrap_or_default();
    let fav_class = if card.favourite { " fav" } else { "" };
    let star = if card.favourite { "★" } else { "☆" };

    format!(
        r#"
      <div class="linkCard {vis}" data-item-id="{id}">
        <a href="{href}" target="_blank" rel="noopener" class="cardTitle" data-action="track-click">{title}</a>
        {notes}
        {badge}
        <button class="starBtn{fav_class}" data-action="toggle-fav" aria-pressed="{pressed}" title="Toggle favourite">{star}</button>
      </div>"#,
        vis = escape_html(vis_class),
        id = escape_html(&card.id),
        href = escape_html(&card.href),
        title = highlight(&card.title, query),
        notes = notes,
        badge = badge,
        fav_class = fav_class,
        pressed = pressed(card.favourite),
        star = star,
    )
}

fn render_section(section: &SectionView, query: &str) -> String {
    let cards: String = section
        .cards
        .iter()
        .map(|c| render_card(c, query))
        .collect();
    format!(
        r#"
    <section class="section" id="{id}">
      <details class="card" data-section-id="{id}"{open}>
        <summary>{title} <span class="count">{count}</span></summary>
        <div class="cardGrid">{cards}
        </div>
      </details>
    </section>"#,
        id = escape_html(&section.id),
        open = if section.open { " open" } else { "" },
        title = escape_html(&section.title),
        count = section.cards.len(),
        cards = cards,
    )
}

fn render_content(view: &PageView) -> String {
    match &view.content {
        Content::Sections { sections } => sections
            .iter()
            .map(|s| render_section(s, &view.query))
            .collect(),
        Content::Empty { message } => {
            format!(r#"<div class="empty">{}</div>"#, escape_html(message))
        }
        Content::Error { message } => {
            format!(
                r#"<div class="empty error">⚠️ {}</div>"#,
                escape_html(message)
            )
        }
    }
}

fn render_nav(view: &PageView) -> String {
    view.nav
        .iter()
        .map(|n| {
            format!(
                r##"<a class="navLink" data-jump="{id}" href="#{id}"><span>{title}</span><span class="count">{count}</span></a>"##,
                id = escape_html(&n.id),
                title = escape_html(&n.title),
                count = n.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ")
}

pub fn render_html(view: &PageView) -> Vec<u8> {
    let mut body_classes: Vec<&str> = Vec::new();
    if view.theme.dark_class {
        body_classes.push("dark");
    }
    if view.compact {
        body_classes.push("compact-mode");
    }
    if view.sidebar_collapsed {
        body_classes.push("sidebar-collapsed");
    }
    body_classes.push(match view.view {
        crate::store::ViewMode::Grid => "view-grid",
        crate::store::ViewMode::List => "view-list",
    });

    let subtitle = if view.is_error() {
        String::new()
    } else {
        format!("{} items shown", view.total_shown)
    };
    let smart = if view.chips.smart_search { "On" } else { "Off" };

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en" data-theme="{data_theme}" style="{css_vars}">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>Resource Hub</title>
  <style>
    :root {{
      --bg: #f8fafc; --fg: #0f172a; --muted: #64748b; --panel: #ffffff; --border: #e2e8f0;
    }}
    body.dark {{
      --bg: #0f172a; --fg: #f1f5f9; --muted: #94a3b8; --panel: #1e293b; --border: #334155;
    }}
    @media (prefers-color-scheme: dark) {{
      html[data-theme="auto"] body {{
        --bg: #0f172a; --fg: #f1f5f9; --muted: #94a3b8; --panel: #1e293b; --border: #334155;
      }}
    }}
    body {{ margin: 0; font-family: Inter, system-ui, sans-serif; background: var(--bg); color: var(--fg); }}
    .layout {{ display: flex; min-height: 100vh; }}
    .sidebar {{ width: 260px; border-right: 1px solid var(--border); padding: 1rem; background: var(--panel); }}
    body.sidebar-collapsed .sidebar {{ display: none; }}
    .navLink {{ display: flex; justify-content: space-between; padding: .4rem .6rem; border-radius: .5rem; color: inherit; text-decoration: none; }}
    .navLink:hover {{ background: var(--border); }}
    main {{ flex: 1; padding: 1.5rem 2rem; }}
    .chips {{ display: flex; gap: .5rem; margin: .75rem 0 1.25rem; }}
    .chip {{ border: 1px solid var(--border); border-radius: 999px; padding: .25rem .75rem; background: var(--panel); color: inherit; }}
    .chip[aria-pressed="true"] {{ background: var(--accent); color: #fff; border-color: var(--accent); }}
    .section {{ margin-bottom: 1rem; }}
    details.card {{ background: var(--panel); border: 1px solid var(--border); border-radius: .75rem; padding: .75rem 1rem; }}
    summary {{ font-weight: 700; cursor: pointer; }}
    .count {{ color: var(--muted); font-weight: 500; margin-left: .5rem; }}
    .cardGrid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: .75rem; margin-top: .75rem; }}
    body.view-list .cardGrid {{ grid-template-columns: 1fr; }}
    body.compact-mode .cardGrid {{ gap: .4rem; }}
    .linkCard {{ position: relative; border: 1px solid var(--border); border-radius: .5rem; padding: .75rem 2.25rem .75rem .75rem; }}
    body.compact-mode .linkCard {{ padding: .4rem 2rem .4rem .5rem; }}
    .cardTitle {{ color: var(--accent-strong); font-weight: 600; text-decoration: none; }}
    .cardNotes {{ color: var(--muted); font-size: .85rem; margin-top: .25rem; }}
    .badge {{ display: inline-block; font-size: .7rem; text-transform: uppercase; color: var(--muted); margin-top: .35rem; }}
    .starBtn {{ position: absolute; top: .5rem; right: .5rem; border: 0; background: none; color: var(--muted); cursor: pointer; }}
    .starBtn.fav {{ color: #f59e0b; }}
    mark {{ background: var(--accent); color: #fff; border-radius: .2rem; }}
    .empty {{ padding: 2rem; text-align: center; color: var(--muted); }}
    .empty.error {{ color: #dc2626; }}
  </style>
</head>
<body class="{body_classes}">
  <div class="layout">
    <nav class="sidebar" id="sideNav">
      {nav}
    </nav>
    <main>
      <header>
        <h1>Resource Hub</h1>
        <p id="subtitle">{subtitle}</p>
        <form method="get"><input id="q" name="q" type="search" placeholder="Search links..." value="{query}"/></form>
        <div class="chips">
          <button class="chip" id="chipFavs" aria-pressed="{only_favs}">★ Favourites</button>
          <button class="chip" data-vis="internal" aria-pressed="{internal}">Internal</button>
          <button class="chip" data-vis="external" aria-pressed="{external}">External</button>
          <button class="chip" id="smartSearchToggle" aria-pressed="{smart_pressed}">🔍 Smart Search: {smart}</button>
        </div>
      </header>
      <div id="container">{content}
      </div>
    </main>
  </div>
</body>
</html>
"####,
        data_theme = view.theme.data_theme,
        css_vars = escape_html(&view.theme.css_variables()),
        body_classes = body_classes.join(" "),
        nav = render_nav(view),
        subtitle = subtitle,
        query = escape_html(&view.query),
        only_favs = pressed(view.chips.only_favs),
        internal = pressed(view.chips.internal),
        external = pressed(view.chips.external),
        smart_pressed = pressed(view.chips.smart_search),
        smart = smart,
        content = render_content(view),
    );
    html.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{build_view, error_view};
    use crate::store::Preferences;
    use crate::theme::Theme;

    fn doc() -> crate::model::Document {
        crate::loader::parse_document(
            br#"{"groups":[{"title":"Docs <1>","items":[
                {"id":"a","title":"API Guide","url":"https://x","notes":"reference","vis":"internal"},
                {"id":"b","title":"Evil","url":"javascript:alert(1)"}
            ]}]}"#,
            "test",
        )
        .unwrap()
    }

    #[test]
    fn html_escapes_titles_and_neutralizes_unsafe_links() {
        let view = build_view(&doc(), "", &Preferences::default(), &Default::default());
        let html = String::from_utf8(render_html(&view)).unwrap();
        assert!(html.contains("Docs &lt;1&gt;"));
        assert!(html.contains(r##"<a href="#" target="_blank""##));
        assert!(!html.contains("javascript:alert"));
    }

    #[test]
    fn html_highlights_query_and_reflects_theme() {
        let mut prefs = Preferences::default();
        prefs.theme = Theme::Dark;
        prefs.favourites.insert("a".to_string());
        let view = build_view(&doc(), "api", &prefs, &Default::default());
        let html = String::from_utf8(render_html(&view)).unwrap();
        assert!(html.contains(r#"data-theme="dark""#));
        assert!(html.contains(r#"<body class="dark compact-mode view-grid">"#));
        assert!(html.contains("<mark>API</mark> Guide"));
        assert!(html.contains(r#"class="starBtn fav""#));
    }

    #[test]
    fn html_shows_empty_and_error_placeholders() {
        let view = build_view(&doc(), "zzz", &Preferences::default(), &Default::default());
        let html = String::from_utf8(render_html(&view)).unwrap();
        assert!(html.contains(r#"<div class="empty">No matches found.</div>"#));

        let html = String::from_utf8(render_html(&error_view(&Preferences::default()))).unwrap();
        assert!(html.contains("Failed to load data."));
        assert!(!html.contains("items shown"));
    }
}
