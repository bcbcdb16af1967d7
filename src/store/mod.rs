//! Persisted user preferences.
//!
//! Storage sits behind [`KeyValueStore`] so the session never touches the
//! filesystem directly. [`PreferenceStore`] adds typed accessors on top:
//! reads fall back to a default for absent or malformed values, and write
//! failures are logged and dropped.

pub mod file;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Visibility;
use crate::theme::{clamp_shift, Accent, Theme};

pub use file::FileStore;
pub use memory::MemoryStore;

pub mod keys {
    pub const FAVS: &str = "agent.favs.v2";
    pub const OPEN_SECTIONS: &str = "agent.openSections.v2";
    pub const THEME: &str = "agent.theme";
    pub const ACCENT: &str = "agent.accent";
    pub const ACCENT_SHIFT: &str = "agent.accentShift";
    pub const VIEW: &str = "agent.view";
    pub const COMPACT: &str = "agent.compact";
    pub const SIDEBAR_COLLAPSED: &str = "agent.sidebarCollapsed";
    pub const FILTERS: &str = "agent.filters.v1";
    pub const USAGE: &str = "agent.usage.v1";
    pub const SMART_SEARCH: &str = "agent.smartSearch";

    pub const ALL: &[&str] = &[
        FAVS,
        OPEN_SECTIONS,
        THEME,
        ACCENT,
        ACCENT_SHIFT,
        VIEW,
        COMPACT,
        SIDEBAR_COLLAPSED,
        FILTERS,
        USAGE,
        SMART_SEARCH,
    ];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write store file: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file is not a JSON object: {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// String key-value persistence, the shape of browser `localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(rename = "onlyFavs", default)]
    pub only_favs: bool,
    #[serde(default)]
    pub vis: Vec<Visibility>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub favourites: BTreeSet<String>,
    pub open_sections: BTreeSet<String>,
    pub theme: Theme,
    pub accent: Accent,
    pub accent_shift: i32,
    pub view: ViewMode,
    pub compact: bool,
    pub sidebar_collapsed: bool,
    pub filters: Filters,
    pub usage: BTreeMap<String, u64>,
    pub smart_search: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            favourites: BTreeSet::new(),
            open_sections: BTreeSet::new(),
            theme: Theme::Light,
            accent: Accent::default(),
            accent_shift: 0,
            view: ViewMode::Grid,
            compact: true,
            sidebar_collapsed: false,
            filters: Filters::default(),
            usage: BTreeMap::new(),
            smart_search: false,
        }
    }
}

pub struct PreferenceStore<S> {
    backend: S,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_inner(self) -> S {
        self.backend
    }

    pub fn load(&self) -> Preferences {
        let defaults = Preferences::default();
        Preferences {
            favourites: self.read_json(keys::FAVS, defaults.favourites),
            open_sections: self.read_json(keys::OPEN_SECTIONS, defaults.open_sections),
            theme: self.theme(),
            accent: self.accent(),
            accent_shift: self.accent_shift(),
            view: self.read_parsed(keys::VIEW, ViewMode::parse, defaults.view),
            compact: self.read_bool(keys::COMPACT, defaults.compact),
            sidebar_collapsed: self.read_bool(keys::SIDEBAR_COLLAPSED, defaults.sidebar_collapsed),
            filters: self.read_json(keys::FILTERS, defaults.filters),
            usage: self.read_json(keys::USAGE, defaults.usage),
            smart_search: self.read_bool(keys::SMART_SEARCH, defaults.smart_search),
        }
    }

    pub fn theme(&self) -> Theme {
        self.read_parsed(keys::THEME, Theme::parse, Theme::default())
    }

    pub fn accent(&self) -> Accent {
        self.read_parsed(keys::ACCENT, |v| Accent::parse(v).ok(), Accent::default())
    }

    pub fn accent_shift(&self) -> i32 {
        clamp_shift(self.read_parsed(keys::ACCENT_SHIFT, |v| v.trim().parse().ok(), 0))
    }

    pub fn save_favourites(&mut self, ids: &BTreeSet<String>) {
        self.write_json(keys::FAVS, ids);
    }

    pub fn save_open_sections(&mut self, ids: &BTreeSet<String>) {
        self.write_json(keys::OPEN_SECTIONS, ids);
    }

    pub fn save_theme(&mut self, theme: Theme) {
        self.write_raw(keys::THEME, theme.as_str());
    }

    pub fn save_accent(&mut self, accent: &Accent) {
        self.write_raw(keys::ACCENT, accent.token());
    }

    pub fn save_accent_shift(&mut self, shift: i32) {
        self.write_raw(keys::ACCENT_SHIFT, &clamp_shift(shift).to_string());
    }

    pub fn save_view(&mut self, view: ViewMode) {
        self.write_raw(keys::VIEW, view.as_str());
    }

    pub fn save_compact(&mut self, compact: bool) {
        self.write_raw(keys::COMPACT, bool_str(compact));
    }

    pub fn save_sidebar_collapsed(&mut self, collapsed: bool) {
        self.write_raw(keys::SIDEBAR_COLLAPSED, bool_str(collapsed));
    }

    pub fn save_filters(&mut self, filters: &Filters) {
        self.write_json(keys::FILTERS, filters);
    }

    pub fn save_usage(&mut self, usage: &BTreeMap<String, u64>) {
        self.write_json(keys::USAGE, usage);
    }

    pub fn save_smart_search(&mut self, enabled: bool) {
        self.write_raw(keys::SMART_SEARCH, bool_str(enabled));
    }

    pub fn clear(&mut self) {
        for key in keys::ALL {
            if let Err(e) = self.backend.remove(key) {
                tracing::warn!(key = *key, error = %e, "failed to remove preference");
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "preference read failed, using default");
                None
            }
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.read_raw(key) else {
            return default;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key, error = %e, "malformed preference, using default");
                default
            }
        }
    }

    fn read_parsed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
        self.read_raw(key)
            .and_then(|raw| parse(&raw))
            .unwrap_or(default)
    }

    fn read_bool(&self, key: &str, default: bool) -> bool {
        self.read_parsed(
            key,
            |raw| match raw.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            default,
        )
    }

    fn write_raw(&mut self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            tracing::warn!(key, error = %e, "preference write failed, keeping session-only value");
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_raw(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "failed to encode preference"),
        }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_loads_defaults() {
        let store = PreferenceStore::new(MemoryStore::new());
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn theme_round_trips() {
        let mut store = PreferenceStore::new(MemoryStore::new());
        store.save_theme(Theme::Dark);
        let reloaded = PreferenceStore::new(store.into_inner());
        assert_eq!(reloaded.load().theme, Theme::Dark);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let mut backend = MemoryStore::new();
        backend.set(keys::FAVS, "{not json").unwrap();
        backend.set(keys::THEME, "sepia").unwrap();
        backend.set(keys::FILTERS, "[]").unwrap();
        backend.set(keys::SMART_SEARCH, "yes").unwrap();
        backend.set(keys::ACCENT, "#xyz").unwrap();
        let prefs = PreferenceStore::new(backend).load();
        assert!(prefs.favourites.is_empty());
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.filters, Filters::default());
        assert!(!prefs.smart_search);
        assert_eq!(prefs.accent, Accent::default());
    }

    #[test]
    fn filters_use_the_camel_case_wire_shape() {
        let mut backend = MemoryStore::new();
        backend
            .set(keys::FILTERS, r#"{"onlyFavs":true,"vis":["External"]}"#)
            .unwrap();
        let prefs = PreferenceStore::new(backend).load();
        assert!(prefs.filters.only_favs);
        assert_eq!(prefs.filters.vis, vec![Visibility::External]);
    }

    #[test]
    fn failed_writes_are_swallowed() {
        let mut store = PreferenceStore::new(MemoryStore::failing_writes());
        store.save_theme(Theme::Dark);
        store.save_favourites(&BTreeSet::from(["a".to_string()]));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn accent_shift_is_clamped_on_read() {
        let mut backend = MemoryStore::new();
        backend.set(keys::ACCENT_SHIFT, "400").unwrap();
        assert_eq!(PreferenceStore::new(backend).accent_shift(), 50);
    }

    #[test]
    fn clear_removes_every_key() {
        let mut store = PreferenceStore::new(MemoryStore::new());
        store.save_theme(Theme::Dark);
        store.save_smart_search(true);
        store.clear();
        assert!(store.backend().is_empty());
    }
}
