use std::error::Error;

use linkhub::store::{FileStore, PreferenceStore, ViewMode};
use linkhub::theme::{Accent, Theme};

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::temp_dir().join(format!(
        "linkhub_demo_storage_{}.json",
        std::process::id()
    ));

    let mut store = PreferenceStore::new(FileStore::open_or_empty(&path));
    store.save_theme(Theme::Dark);
    store.save_accent(&Accent::parse("#0a84ff")?);
    store.save_accent_shift(-20);
    store.save_view(ViewMode::List);

    let reopened = PreferenceStore::new(FileStore::open(&path)?);
    let prefs = reopened.load();
    println!("Theme:  {}", prefs.theme.as_str());
    println!("Accent: {} (shift {})", prefs.accent.token(), prefs.accent_shift);
    println!("View:   {}", prefs.view.as_str());
    println!("Stored: {}", std::fs::read_to_string(&path)?);

    std::fs::remove_file(&path)?;
    Ok(())
}
