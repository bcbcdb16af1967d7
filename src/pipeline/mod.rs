//! Search, filter and section assembly.
//!
//! [`build_view`] is a pure function of the loaded document, the query and
//! the preference snapshot. Renderers in `output` only ever see the
//! resulting [`PageView`].

use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;

use crate::model::{Document, LinkItem, Visibility};
use crate::store::{Preferences, ViewMode};
use crate::theme::{theme_attributes, ThemeAttributes};
use crate::utils::{self, DEFAULT_FUZZY_THRESHOLD};

pub const SUGGESTED_ID: &str = "suggested";
pub const SUGGESTED_TITLE: &str = "Suggested for You";
pub const FAVOURITES_ID: &str = "favs";
pub const FAVOURITES_TITLE: &str = "Favourites";
pub const EMPTY_MESSAGE: &str = "No matches found.";
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load data.";
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    pub suggestion_limit: usize,
    pub fuzzy_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Suggested,
    Favourites,
    Group,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub href: String,
    pub notes: Option<String>,
    pub badge: Option<String>,
    pub favourite: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub kind: SectionKind,
    pub open: bool,
    pub cards: Vec<CardView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavEntry {
    pub id: String,
    pub title: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChipState {
    pub only_favs: bool,
    pub internal: bool,
    pub external: bool,
    pub smart_search: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Content {
    Sections { sections: Vec<SectionView> },
    Empty { message: String },
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageView {
    pub query: String,
    pub content: Content,
    pub nav: Vec<NavEntry>,
    pub total_shown: usize,
    pub total_all: usize,
    pub chips: ChipState,
    pub theme: ThemeAttributes,
    pub view: ViewMode,
    pub compact: bool,
    pub sidebar_collapsed: bool,
}

impl PageView {
    pub fn sections(&self) -> &[SectionView] {
        match &self.content {
            Content::Sections { sections } => sections,
            _ => &[],
        }
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardView> {
        self.sections().iter().flat_map(|s| s.cards.iter())
    }

    pub fn is_error(&self) -> bool {
        matches!(self.content, Content::Error { .. })
    }
}

struct Section<'a> {
    id: &'a str,
    title: &'a str,
    kind: SectionKind,
    items: Vec<&'a LinkItem>,
}

/// Top-N most used items that still exist in the document.
pub fn suggested_items<'a>(
    document: &'a Document,
    prefs: &Preferences,
    limit: usize,
) -> Vec<&'a LinkItem> {
    prefs
        .usage
        .iter()
        .filter(|(_, count)| **count > 0)
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        .filter_map(|(id, _)| document.find_item(id))
        .take(limit)
        .collect()
}

pub fn favourite_items<'a>(document: &'a Document, prefs: &Preferences) -> Vec<&'a LinkItem> {
    document
        .items()
        .filter(|i| prefs.favourites.contains(&i.id))
        .collect()
}

pub struct ItemFilter<'a> {
    only_favs: bool,
    favourites: &'a std::collections::BTreeSet<String>,
    vis: HashSet<&'a Visibility>,
    query: String,
    fuzzy: Option<f64>,
}

impl<'a> ItemFilter<'a> {
    pub fn new(prefs: &'a Preferences, query: &str, settings: &PipelineSettings) -> Self {
        Self {
            only_favs: prefs.filters.only_favs,
            favourites: &prefs.favourites,
            vis: prefs.filters.vis.iter().collect(),
            query: query.trim().to_string(),
            fuzzy: prefs.smart_search.then_some(settings.fuzzy_threshold),
        }
    }

    pub fn matches(&self, item: &LinkItem) -> bool {
        if self.only_favs && !self.favourites.contains(&item.id) {
            return false;
        }
        if !self.vis.is_empty() {
            match item.vis.as_ref() {
                Some(v) if self.vis.contains(v) => {}
                _ => return false,
            }
        }
        if self.query.is_empty() {
            return true;
        }
        let haystack = item.haystack();
        match self.fuzzy {
            Some(threshold) => utils::fuzzy_match(&haystack, &self.query, threshold),
            None => utils::contains_case_insensitive(&haystack, &self.query),
        }
    }
}

fn card_view(item: &LinkItem, prefs: &Preferences) -> CardView {
    CardView {
        id: item.id.clone(),
        title: item.title.clone(),
        href: utils::safe_href(&item.url).to_string(),
        notes: item.notes.clone(),
        badge: item.vis.as_ref().map(|v| v.to_string()),
        favourite: prefs.favourites.contains(&item.id),
    }
}

pub fn build_view(
    document: &Document,
    query: &str,
    prefs: &Preferences,
    settings: &PipelineSettings,
) -> PageView {
    let q = query.trim();
    let mut sections: Vec<Section<'_>> = Vec::new();

    if q.is_empty() && !prefs.usage.is_empty() {
        let items = suggested_items(document, prefs, settings.suggestion_limit);
        if !items.is_empty() {
            sections.push(Section {
                id: SUGGESTED_ID,
                title: SUGGESTED_TITLE,
                kind: SectionKind::Suggested,
                items,
            });
        }
    }

    let favs = favourite_items(document, prefs);
    if !favs.is_empty() {
        sections.push(Section {
            id: FAVOURITES_ID,
            title: FAVOURITES_TITLE,
            kind: SectionKind::Favourites,
            items: favs,
        });
    }

    for g in document.groups.iter() {
        sections.push(Section {
            id: &g.id,
            title: &g.title,
            kind: SectionKind::Group,
            items: g.items.iter().collect(),
        });
    }

    let filter = ItemFilter::new(prefs, q, settings);
    let rendered: Vec<SectionView> = sections
        .into_iter()
        .filter_map(|s| {
            let cards: Vec<CardView> = s
                .items
                .into_iter()
                .filter(|i| filter.matches(i))
                .map(|i| card_view(i, prefs))
                .collect();
            if cards.is_empty() {
                return None;
            }
            Some(SectionView {
                id: s.id.to_string(),
                title: s.title.to_string(),
                kind: s.kind,
                open: prefs.open_sections.contains(s.id),
                cards,
            })
        })
        .collect();

    let nav = rendered
        .iter()
        .map(|s| NavEntry {
            id: s.id.clone(),
            title: s.title.clone(),
            count: s.cards.len(),
        })
        .collect();
    let total_shown = rendered.iter().map(|s| s.cards.len()).sum();
    let content = if rendered.is_empty() {
        Content::Empty {
            message: EMPTY_MESSAGE.to_string(),
        }
    } else {
        Content::Sections { sections: rendered }
    };

    PageView {
        query: q.to_string(),
        content,
        nav,
        total_shown,
        total_all: document.item_count(),
        chips: chip_state(prefs),
        theme: theme_attributes(prefs.theme, &prefs.accent, prefs.accent_shift),
        view: prefs.view,
        compact: prefs.compact,
        sidebar_collapsed: prefs.sidebar_collapsed,
    }
}

/// The view shown when the document could not be loaded.
pub fn error_view(prefs: &Preferences) -> PageView {
    PageView {
        query: String::new(),
        content: Content::Error {
            message: LOAD_ERROR_MESSAGE.to_string(),
        },
        nav: Vec::new(),
        total_shown: 0,
        total_all: 0,
        chips: chip_state(prefs),
        theme: theme_attributes(prefs.theme, &prefs.accent, prefs.accent_shift),
        view: prefs.view,
        compact: prefs.compact,
        sidebar_collapsed: prefs.sidebar_collapsed,
    }
}

fn chip_state(prefs: &Preferences) -> ChipState {
    ChipState {
        only_favs: prefs.filters.only_favs,
        internal: prefs.filters.vis.contains(&Visibility::Internal),
        external: prefs.filters.vis.contains(&Visibility::External),
        smart_search: prefs.smart_search,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_document;

    fn doc() -> Document {
        parse_document(
            br#"{"groups":[
                {"title":"Docs","items":[
                    {"id":"api","title":"API Guide","url":"https://x","notes":"reference","vis":"internal"},
                    {"id":"blog","title":"Engineering Blog","url":"https://blog","vis":"external"}
                ]},
                {"title":"Tools","items":[
                    {"id":"ci","title":"CI Dashboard","url":"https://ci","notes":"builds"},
                    {"id":"bad","title":"Sketchy","url":"javascript:alert(1)"}
                ]}
            ]}"#,
            "test",
        )
        .unwrap()
    }

    fn ids(view: &PageView) -> Vec<&str> {
        view.cards().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn empty_query_shows_every_group_in_order() {
        let view = build_view(&doc(), "", &Preferences::default(), &Default::default());
        let titles: Vec<_> = view.sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Docs", "Tools"]);
        assert_eq!(view.total_shown, 4);
        assert_eq!(view.total_all, 4);
    }

    #[test]
    fn suggested_then_favourites_then_groups() {
        let mut prefs = Preferences::default();
        prefs.usage.insert("ci".to_string(), 3);
        prefs.usage.insert("blog".to_string(), 7);
        prefs.usage.insert("gone".to_string(), 99);
        prefs.favourites.insert("api".to_string());
        let view = build_view(&doc(), "", &prefs, &Default::default());
        let kinds: Vec<_> = view.sections().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Suggested,
                SectionKind::Favourites,
                SectionKind::Group,
                SectionKind::Group
            ]
        );
        let suggested: Vec<_> = view.sections()[0].cards.iter().map(|c| &c.id).collect();
        assert_eq!(suggested, vec!["blog", "ci"]);
    }

    #[test]
    fn suggestions_hidden_while_searching() {
        let mut prefs = Preferences::default();
        prefs.usage.insert("api".to_string(), 1);
        let view = build_view(&doc(), "api", &prefs, &Default::default());
        assert!(view
            .sections()
            .iter()
            .all(|s| s.kind != SectionKind::Suggested));
    }

    #[test]
    fn suggestion_limit_is_respected() {
        let mut prefs = Preferences::default();
        for (i, id) in ["api", "blog", "ci", "bad"].iter().enumerate() {
            prefs.usage.insert(id.to_string(), i as u64 + 1);
        }
        let settings = PipelineSettings {
            suggestion_limit: 2,
            ..Default::default()
        };
        let view = build_view(&doc(), "", &prefs, &settings);
        assert_eq!(view.sections()[0].cards.len(), 2);
    }

    #[test]
    fn stale_favourites_are_inert() {
        let mut prefs = Preferences::default();
        prefs.favourites.insert("gone".to_string());
        let view = build_view(&doc(), "", &prefs, &Default::default());
        assert!(view
            .sections()
            .iter()
            .all(|s| s.kind != SectionKind::Favourites));
    }

    #[test]
    fn only_favs_drops_everything_else() {
        let mut prefs = Preferences::default();
        prefs.favourites.insert("ci".to_string());
        prefs.filters.only_favs = true;
        let view = build_view(&doc(), "", &prefs, &Default::default());
        assert_eq!(ids(&view), vec!["ci", "ci"]);
        assert!(view.cards().all(|c| c.favourite));
    }

    #[test]
    fn visibility_chip_keeps_tagged_items_only() {
        let mut prefs = Preferences::default();
        prefs.filters.vis = vec![Visibility::External];
        let view = build_view(&doc(), "", &prefs, &Default::default());
        assert_eq!(ids(&view), vec!["blog"]);
    }

    #[test]
    fn text_filter_matches_notes_too() {
        let view = build_view(&doc(), "BUILDS", &Preferences::default(), &Default::default());
        assert_eq!(ids(&view), vec!["ci"]);
    }

    #[test]
    fn smart_search_tolerates_typos() {
        let mut prefs = Preferences::default();
        let plain = build_view(&doc(), "dashbord", &prefs, &Default::default());
        assert!(matches!(plain.content, Content::Empty { .. }));
        prefs.smart_search = true;
        let fuzzy = build_view(&doc(), "dashbord", &prefs, &Default::default());
        assert_eq!(ids(&fuzzy), vec!["ci"]);
    }

    #[test]
    fn unsafe_urls_render_as_fragment() {
        let view = build_view(&doc(), "sketchy", &Preferences::default(), &Default::default());
        assert_eq!(view.cards().next().unwrap().href, "#");
    }

    #[test]
    fn open_state_comes_from_preferences() {
        let mut prefs = Preferences::default();
        prefs.open_sections.insert("tools".to_string());
        let view = build_view(&doc(), "", &prefs, &Default::default());
        let open: Vec<_> = view.sections().iter().map(|s| (s.id.as_str(), s.open)).collect();
        assert_eq!(open, vec![("docs", false), ("tools", true)]);
    }

    #[test]
    fn nav_mirrors_rendered_sections() {
        let view = build_view(&doc(), "guide", &Preferences::default(), &Default::default());
        assert_eq!(
            view.nav,
            vec![NavEntry {
                id: "docs".to_string(),
                title: "Docs".to_string(),
                count: 1
            }]
        );
    }
}
