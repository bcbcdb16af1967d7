use thiserror::Error;

use crate::model::{Document, Visibility};
use crate::pipeline::{self, PageView, PipelineSettings};
use crate::store::{KeyValueStore, PreferenceStore, Preferences, ViewMode};
use crate::theme::{clamp_shift, Accent, Theme};

/// Everything a user can do to the hub. Each variant is one interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SetQuery(String),
    ToggleFavourite(String),
    OpenItem(String),
    ToggleFavouritesOnly,
    ToggleVisibility(Visibility),
    ToggleSmartSearch,
    ToggleTheme,
    SetTheme(Theme),
    SetAccent(Accent),
    SetAccentShift(i32),
    SetView(ViewMode),
    SetCompact(bool),
    ToggleSidebar,
    ExpandAll,
    CollapseAll,
    SetSectionOpen { id: String, open: bool },
    ResetPreferences,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    /// `OpenItem` resolved; the caller launches the URL.
    Open { url: String },
    FavouriteToggled { id: String, favourite: bool },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no item with id '{id}' in the loaded document")]
    UnknownItem { id: String },

    #[error("refusing to open unsafe url '{url}'")]
    UnsafeUrl { url: String },
}

/// Application state: the loaded document, persisted preferences and the
/// current query. All mutation goes through [`Session::dispatch`].
pub struct Session<S> {
    document: Document,
    store: PreferenceStore<S>,
    prefs: Preferences,
    query: String,
    settings: PipelineSettings,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(
        document: Document,
        store: PreferenceStore<S>,
        settings: PipelineSettings,
    ) -> Self {
        let prefs = store.load();
        let mut session = Self {
            document,
            store,
            prefs,
            query: String::new(),
            settings,
        };
        session.expand_if_unset();
        session
    }

    /// Sections start expanded when nothing has been persisted yet.
    fn expand_if_unset(&mut self) {
        if self.prefs.open_sections.is_empty() && !self.document.groups.is_empty() {
            self.prefs.open_sections = self.document.group_ids().into_iter().collect();
            self.store.save_open_sections(&self.prefs.open_sections);
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn store(&self) -> &PreferenceStore<S> {
        &self.store
    }

    pub fn into_store(self) -> PreferenceStore<S> {
        self.store
    }

    pub fn view(&self) -> PageView {
        pipeline::build_view(&self.document, &self.query, &self.prefs, &self.settings)
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, SessionError> {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::SetQuery(q) => {
                self.query = q;
            }
            Action::ToggleFavourite(id) => {
                let favourite = if self.prefs.favourites.remove(&id) {
                    false
                } else {
                    self.prefs.favourites.insert(id.clone());
                    true
                };
                self.store.save_favourites(&self.prefs.favourites);
                return Ok(Outcome::FavouriteToggled { id, favourite });
            }
            Action::OpenItem(id) => {
                let item = self
                    .document
                    .find_item(&id)
                    .ok_or_else(|| SessionError::UnknownItem { id: id.clone() })?;
                if !crate::utils::is_safe_url(&item.url) {
                    return Err(SessionError::UnsafeUrl {
                        url: item.url.clone(),
                    });
                }
                let url = item.url.clone();
                *self.prefs.usage.entry(id).or_insert(0) += 1;
                self.store.save_usage(&self.prefs.usage);
                return Ok(Outcome::Open { url });
            }
            Action::ToggleFavouritesOnly => {
                self.prefs.filters.only_favs = !self.prefs.filters.only_favs;
                self.store.save_filters(&self.prefs.filters);
            }
            Action::ToggleVisibility(vis) => {
                let active = self.prefs.filters.vis.contains(&vis);
                self.prefs.filters.vis.clear();
                if !active {
                    self.prefs.filters.vis.push(vis);
                }
                self.store.save_filters(&self.prefs.filters);
            }
            Action::ToggleSmartSearch => {
                self.prefs.smart_search = !self.prefs.smart_search;
                self.store.save_smart_search(self.prefs.smart_search);
            }
            Action::ToggleTheme => {
                self.prefs.theme = self.prefs.theme.toggled();
                self.store.save_theme(self.prefs.theme);
            }
            Action::SetTheme(theme) => {
                self.prefs.theme = theme;
                self.store.save_theme(theme);
            }
            Action::SetAccent(accent) => {
                self.store.save_accent(&accent);
                self.prefs.accent = accent;
            }
            Action::SetAccentShift(shift) => {
                self.prefs.accent_shift = clamp_shift(shift);
                self.store.save_accent_shift(self.prefs.accent_shift);
            }
            Action::SetView(view) => {
                self.prefs.view = view;
                self.store.save_view(view);
            }
            Action::SetCompact(compact) => {
                self.prefs.compact = compact;
                self.store.save_compact(compact);
            }
            Action::ToggleSidebar => {
                self.prefs.sidebar_collapsed = !self.prefs.sidebar_collapsed;
                self.store.save_sidebar_collapsed(self.prefs.sidebar_collapsed);
            }
            Action::ExpandAll => {
                self.prefs.open_sections = self.document.group_ids().into_iter().collect();
                self.store.save_open_sections(&self.prefs.open_sections);
            }
            Action::CollapseAll => {
                self.prefs.open_sections.clear();
                self.store.save_open_sections(&self.prefs.open_sections);
            }
            Action::SetSectionOpen { id, open } => {
                if open {
                    self.prefs.open_sections.insert(id);
                } else {
                    self.prefs.open_sections.remove(&id);
                }
                self.store.save_open_sections(&self.prefs.open_sections);
            }
            Action::ResetPreferences => {
                self.store.clear();
                self.prefs = Preferences::default();
                self.query.clear();
                self.expand_if_unset();
            }
        }
        Ok(Outcome::Updated)
    }
}
