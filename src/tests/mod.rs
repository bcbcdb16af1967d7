use std::thread;

use tempfile::tempdir;
use tiny_http::{Header, Response, Server};

use crate::loader::{self, DataSource, LoadOptions, LoaderError};
use crate::model::Document;
use crate::pipeline::{Content, PipelineSettings, EMPTY_MESSAGE};
use crate::session::{Action, Session};
use crate::store::{FileStore, MemoryStore, PreferenceStore};
use crate::theme::Theme;

const FIXTURE: &str = r#"{
  "groups": [
    {
      "title": "Docs",
      "items": [
        {"title": "API Guide", "url": "https://example.com/api", "notes": "REST reference", "vis": "external"},
        {"title": "Runbook", "url": "/runbook", "notes": "on-call steps"}
      ]
    },
    {
      "title": "Team Tools",
      "items": [
        {"title": "Dashboards", "url": "https://grafana.example.com", "vis": "External"},
        {"title": "Wiki", "url": "https://wiki.example.com", "notes": "handbook and api notes"}
      ]
    }
  ]
}"#;

fn fixture() -> Document {
    loader::parse_document(FIXTURE.as_bytes(), "fixture").unwrap()
}

fn memory_session(document: Document) -> Session<MemoryStore> {
    Session::new(
        document,
        PreferenceStore::new(MemoryStore::new()),
        PipelineSettings::default(),
    )
}

/// One-shot HTTP fixture that answers a single request and exits.
fn serve_once(status: u16, body: &'static str) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });
    format!("http://127.0.0.1:{port}/links.json")
}

#[test]
fn api_query_matches_exactly_one_card() {
    let doc = loader::parse_document(
        br#"{"groups":[{"title":"Docs","items":[{"title":"API Guide","url":"https://example.com/api"}]}]}"#,
        "fixture",
    )
    .unwrap();
    let mut session = memory_session(doc);

    session.dispatch(Action::SetQuery("api".into())).unwrap();
    assert_eq!(session.view().cards().count(), 1);

    session.dispatch(Action::SetQuery("zzz".into())).unwrap();
    let view = session.view();
    assert_eq!(view.cards().count(), 0);
    assert_eq!(
        view.content,
        Content::Empty {
            message: EMPTY_MESSAGE.to_string()
        }
    );
}

#[test]
fn every_shown_card_contains_the_query() {
    let doc = fixture();
    let mut session = memory_session(doc.clone());
    for query in ["api", "API", "notes", "run", "e"] {
        session.dispatch(Action::SetQuery(query.into())).unwrap();
        let view = session.view();
        let needle = query.to_lowercase();
        for card in view.cards() {
            let item = doc.find_item(&card.id).unwrap();
            assert!(
                item.haystack().to_lowercase().contains(&needle),
                "{} does not contain {query}",
                item.title
            );
        }
    }
}

#[test]
fn zero_groups_renders_empty_state() {
    let doc = loader::parse_document(br#"{"groups":[]}"#, "fixture").unwrap();
    let session = memory_session(doc);
    let view = session.view();
    assert!(!view.is_error());
    assert!(matches!(view.content, Content::Empty { .. }));
    assert!(view.nav.is_empty());
}

#[test]
fn internal_chip_without_internal_items_is_empty() {
    let mut session = memory_session(fixture());
    session
        .dispatch(Action::ToggleVisibility(crate::model::Visibility::Internal))
        .unwrap();
    assert!(session.view().sections().is_empty());

    session
        .dispatch(Action::ToggleVisibility(crate::model::Visibility::External))
        .unwrap();
    let ids: Vec<String> = session.view().cards().map(|c| c.title.clone()).collect();
    assert_eq!(ids, vec!["API Guide".to_string(), "Dashboards".to_string()]);
}

#[test]
fn favourite_toggle_twice_restores_set() {
    let doc = fixture();
    let id = doc.groups[1].items[0].id.clone();
    let mut session = memory_session(doc);
    let before = session.preferences().favourites.clone();
    session.dispatch(Action::ToggleFavourite(id.clone())).unwrap();
    session.dispatch(Action::ToggleFavourite(id)).unwrap();
    assert_eq!(session.preferences().favourites, before);
}

#[test]
fn dark_theme_round_trips_through_file_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let store = PreferenceStore::new(FileStore::open_or_empty(&path));
    let mut session = Session::new(fixture(), store, PipelineSettings::default());
    session.dispatch(Action::SetTheme(Theme::Dark)).unwrap();
    drop(session);

    let reopened = PreferenceStore::new(FileStore::open(&path).unwrap());
    assert_eq!(reopened.theme(), Theme::Dark);
    let session = Session::new(fixture(), reopened, PipelineSettings::default());
    assert_eq!(session.view().theme.data_theme, "dark");
}

#[test]
fn usage_drives_suggested_section() {
    let doc = fixture();
    let wiki = doc.groups[1].items[1].id.clone();
    let mut session = memory_session(doc);
    session.dispatch(Action::OpenItem(wiki.clone())).unwrap();
    let view = session.view();
    assert_eq!(view.sections()[0].id, crate::pipeline::SUGGESTED_ID);
    assert_eq!(view.sections()[0].cards[0].id, wiki);
}

#[test]
fn failing_storage_still_updates_the_session() {
    let mut session = Session::new(
        fixture(),
        PreferenceStore::new(MemoryStore::failing_writes()),
        PipelineSettings::default(),
    );
    session.dispatch(Action::SetTheme(Theme::Dark)).unwrap();
    assert_eq!(session.preferences().theme, Theme::Dark);
    assert_eq!(session.view().theme.data_theme, "dark");
}

#[tokio::test]
async fn loads_document_over_http() {
    let url = serve_once(200, FIXTURE);
    let client = loader::build_client(5).unwrap();
    let doc = loader::load_document(&client, &DataSource::Url(url), LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(doc.group_ids(), vec!["docs".to_string(), "team-tools".to_string()]);
    assert_eq!(doc.item_count(), 4);
}

#[tokio::test]
async fn non_ok_status_is_a_load_error() {
    let url = serve_once(404, "{}");
    let client = loader::build_client(5).unwrap();
    let err = loader::load_document(&client, &DataSource::Url(url), LoadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::Status { status: 404, .. }));
}

#[tokio::test]
async fn network_first_falls_back_to_cached_copy() {
    let dir = tempdir().unwrap();
    let cache = crate::cache::OfflineCache::new(dir.path(), "v-test");
    let url = serve_once(200, FIXTURE);
    let client = loader::build_client(5).unwrap();
    let options = || LoadOptions {
        cache: Some((&cache, crate::cache::CacheStrategy::NetworkFirst)),
    };

    let fresh = loader::load_document(&client, &DataSource::Url(url.clone()), options())
        .await
        .unwrap();
    // the fixture server is gone, so this is served from disk
    let cached = loader::load_document(&client, &DataSource::Url(url), options())
        .await
        .unwrap();
    assert_eq!(fresh, cached);
}
