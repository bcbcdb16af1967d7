use std::error::Error;

use linkhub::loader::{self, DataSource, LoadOptions};
use linkhub::output::{self, OutputFormat};
use linkhub::pipeline::PipelineSettings;
use linkhub::session::{Action, Session};
use linkhub::store::{MemoryStore, PreferenceStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let source = DataSource::Inline(
        r#"{"groups":[
            {"title":"Docs","items":[
                {"title":"API Guide","url":"https://example.com/api","notes":"REST reference","vis":"external"},
                {"title":"Runbook","url":"/runbook","vis":"internal"}
            ]},
            {"title":"Team Tools","items":[
                {"title":"Dashboards","url":"https://grafana.example.com"}
            ]}
        ]}"#
        .to_string(),
    );

    let client = loader::build_client(5)?;
    let document = loader::load_document(&client, &source, LoadOptions::default()).await?;

    let mut session = Session::new(
        document,
        PreferenceStore::new(MemoryStore::new()),
        PipelineSettings::default(),
    );
    session.dispatch(Action::SetQuery("api".to_string()))?;

    let view = session.view();
    println!("Shown: {} of {}", view.total_shown, view.total_all);
    let html = output::render(&view, OutputFormat::Html);
    let path = std::env::temp_dir().join(format!("linkhub_demo_{}.html", std::process::id()));
    std::fs::write(&path, html)?;
    println!("HTML: {}", path.display());

    print!("{}", String::from_utf8_lossy(&output::render(&view, OutputFormat::Text)));
    Ok(())
}
