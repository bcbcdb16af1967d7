use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse classification used by the visibility chips.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Internal,
    External,
    Other(String),
}

impl Visibility {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "internal" => Self::Internal,
            "external" => Self::External,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vis: Option<Visibility>,
}

impl LinkItem {
    /// Text the search filter runs against.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.notes.as_deref().unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: String,
    pub title: String,
    pub items: Vec<LinkItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub groups: Vec<Group>,
}

impl Document {
    pub fn items(&self) -> impl Iterator<Item = &LinkItem> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }

    pub fn find_item(&self, id: &str) -> Option<&LinkItem> {
        self.items().find(|i| i.id == id)
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.id.clone()).collect()
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}

// Wire shapes as they appear in links.json. Everything but the titles is
// optional there; `normalize` fills in ids.

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub vis: Option<Visibility>,
}

/// FNV-1a over UTF-16 code units, rendered as `auto_xxxxxxxx`.
pub fn stable_id(title: &str, url: &str) -> String {
    let seed = format!("{title}::{url}");
    let mut h: u32 = 0x811c9dc5;
    for unit in seed.encode_utf16() {
        h ^= u32::from(unit);
        h = h.wrapping_mul(0x01000193);
    }
    format!("auto_{h:08x}")
}

pub fn slugify_group_id(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Section ids the view builder uses for its own sections.
pub const RESERVED_SECTION_IDS: &[&str] = &[
    crate::pipeline::SUGGESTED_ID,
    crate::pipeline::FAVOURITES_ID,
];

pub struct NormalizeReport {
    pub document: Document,
    pub renamed_ids: Vec<(String, String)>,
    pub renamed_groups: Vec<(String, String)>,
}

/// Hands out unique ids. Explicit ids from the document are reserved up
/// front so a generated `-N` suffix never takes one of them.
struct IdAllocator {
    assigned: HashSet<String>,
    explicit: HashSet<String>,
    forbidden: HashSet<String>,
}

impl IdAllocator {
    fn new(explicit: HashSet<String>, forbidden: &[&str]) -> Self {
        Self {
            assigned: HashSet::new(),
            explicit,
            forbidden: forbidden.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn taken(&self, candidate: &str) -> bool {
        self.assigned.contains(candidate) || self.forbidden.contains(candidate)
    }

    /// Returns the id to use and whether it differs from `base`.
    fn assign(&mut self, base: &str, is_explicit: bool) -> (String, bool) {
        let reserved_elsewhere = !is_explicit && self.explicit.contains(base);
        if !self.taken(base) && !reserved_elsewhere {
            self.assigned.insert(base.to_string());
            return (base.to_string(), false);
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.taken(&candidate) && !self.explicit.contains(&candidate) {
                self.assigned.insert(candidate.clone());
                return (candidate, true);
            }
            n += 1;
        }
    }
}

fn explicit_id(id: Option<&str>) -> Option<String> {
    id.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn normalize(raw: RawDocument) -> NormalizeReport {
    let explicit_groups: HashSet<String> = raw
        .groups
        .iter()
        .filter_map(|g| explicit_id(g.id.as_deref()))
        .collect();
    let explicit_items: HashSet<String> = raw
        .groups
        .iter()
        .flat_map(|g| g.items.iter())
        .filter_map(|i| explicit_id(i.id.as_deref()))
        .collect();

    let mut group_ids = IdAllocator::new(explicit_groups, RESERVED_SECTION_IDS);
    let mut item_ids = IdAllocator::new(explicit_items, &[]);
    let mut renamed_ids = Vec::new();
    let mut renamed_groups = Vec::new();

    let groups = raw
        .groups
        .into_iter()
        .map(|g| {
            let (base, is_explicit) = match explicit_id(g.id.as_deref()) {
                Some(explicit) => (explicit, true),
                None => (slugify_group_id(&g.title), false),
            };
            let (id, renamed) = group_ids.assign(&base, is_explicit);
            if renamed {
                renamed_groups.push((base, id.clone()));
            }
            let items = g
                .items
                .into_iter()
                .map(|i| {
                    let (base, is_explicit) = match explicit_id(i.id.as_deref()) {
                        Some(explicit) => (explicit, true),
                        None => (stable_id(&i.title, &i.url), false),
                    };
                    let (id, renamed) = item_ids.assign(&base, is_explicit);
                    if renamed {
                        renamed_ids.push((base, id.clone()));
                    }
                    LinkItem {
                        id,
                        title: i.title,
                        url: i.url,
                        notes: i.notes.filter(|n| !n.trim().is_empty()),
                        vis: i.vis,
                    }
                })
                .collect();
            Group {
                id,
                title: g.title,
                items,
            }
        })
        .collect();

    NormalizeReport {
        document: Document { groups },
        renamed_ids,
        renamed_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_deterministic_and_prefixed() {
        let a = stable_id("API Guide", "https://x");
        let b = stable_id("API Guide", "https://x");
        assert_eq!(a, b);
        assert!(a.starts_with("auto_"));
        assert_eq!(a.len(), "auto_".len() + 8);
        assert_ne!(a, stable_id("API Guide", "https://y"));
    }

    #[test]
    fn stable_id_of_empty_seed_matches_fnv_of_separator() {
        // "::" hashed from the FNV offset basis.
        let mut h: u32 = 0x811c9dc5;
        for b in [b':', b':'] {
            h ^= u32::from(b);
            h = h.wrapping_mul(0x01000193);
        }
        assert_eq!(stable_id("", ""), format!("auto_{h:08x}"));
    }

    #[test]
    fn group_ids_are_slugged_titles() {
        assert_eq!(slugify_group_id("Dev  Tools"), "dev-tools");
        assert_eq!(slugify_group_id("Docs"), "docs");
    }

    #[test]
    fn normalize_keeps_explicit_ids_and_dedupes() {
        let raw: RawDocument = serde_json::from_str(
            r#"{"groups":[{"title":"A","items":[
                {"id":"x","title":"One","url":"https://1"},
                {"id":"x","title":"Two","url":"https://2"}
            ]}]}"#,
        )
        .unwrap();
        let report = normalize(raw);
        let ids: Vec<_> = report.document.items().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["x".to_string(), "x-2".to_string()]);
        assert_eq!(report.renamed_ids.len(), 1);
    }

    fn ids_of(json: &str) -> (Vec<String>, Vec<String>) {
        let raw: RawDocument = serde_json::from_str(json).unwrap();
        let doc = normalize(raw).document;
        (
            doc.group_ids(),
            doc.items().map(|i| i.id.clone()).collect(),
        )
    }

    #[test]
    fn generated_suffix_never_takes_an_explicit_id() {
        let (_, ids) = ids_of(
            r#"{"groups":[{"title":"A","items":[
                {"id":"x","title":"One","url":"https://1"},
                {"id":"x","title":"Two","url":"https://2"},
                {"id":"x-2","title":"Three","url":"https://3"}
            ]}]}"#,
        );
        assert_eq!(ids, vec!["x", "x-3", "x-2"]);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn group_ids_are_unique_and_avoid_builtin_sections() {
        let (groups, _) = ids_of(
            r#"{"groups":[
                {"title":"Favs","items":[]},
                {"title":"Favs","items":[]},
                {"title":"Suggested","items":[]},
                {"title":"Docs","items":[]},
                {"title":"docs","items":[]}
            ]}"#,
        );
        assert_eq!(
            groups,
            vec!["favs-2", "favs-3", "suggested-2", "docs", "docs-2"]
        );
    }

    #[test]
    fn explicit_group_id_is_kept_verbatim() {
        let (groups, _) = ids_of(
            r#"{"groups":[
                {"id":" Team_Tools ","title":"Team Tools","items":[]},
                {"title":"Team_Tools","items":[]}
            ]}"#,
        );
        assert_eq!(groups, vec!["Team_Tools", "team_tools"]);
    }

    #[test]
    fn visibility_parse_is_case_insensitive() {
        assert_eq!(Visibility::parse("Internal"), Visibility::Internal);
        assert_eq!(Visibility::parse(" EXTERNAL "), Visibility::External);
        assert_eq!(
            Visibility::parse("partner"),
            Visibility::Other("partner".to_string())
        );
    }
}
