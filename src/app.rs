use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::{CacheStrategy, OfflineCache, DEFAULT_CACHE_VERSION};
use crate::cli::args::{CacheOp, ChipArg, CliArgs, Command, SectionsOp, SwitchArg};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::loader::{self, DataSource, LoadOptions};
use crate::model::{Document, Visibility};
use crate::output::{self, OutputFormat};
use crate::pipeline::{self, PipelineSettings};
use crate::session::{Action, Outcome, Session};
use crate::store::{FileStore, PreferenceStore, Preferences, ViewMode};
use crate::theme::{Accent, Theme};

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');

    if let Some(about) = cmd.get_about() {
        out.push_str(&about.to_string());
        out.push('\n');
    }

    if let Some(long_about) = cmd.get_long_about() {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str("Usage: ");
    out.push_str(cmd.get_name());
    out.push_str(" [OPTIONS] [COMMAND]\n\n");

    out.push_str("Commands:\n");
    for sub in cmd.get_subcommands() {
        let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
        out.push_str(&format!("  {:<13} {}\n", sub.get_name(), about.trim()));
    }
    out.push('\n');

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();

    for arg in cmd.get_arguments() {
        if arg.is_hide_set() {
            continue;
        }

        let heading = arg.get_help_heading().unwrap_or("Options").to_string();

        let idx = match section_idx.get(&heading).copied() {
            Some(i) => i,
            None => {
                sections.push((heading.clone(), Vec::new()));
                let i = sections.len() - 1;
                section_idx.insert(heading, i);
                i
            }
        };

        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");

        for arg in args {
            let mut parts: Vec<String> = Vec::new();

            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }

            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }

            if let Some(aliases) = arg.get_visible_aliases() {
                for alias in aliases {
                    let rendered = format!("--{alias}");
                    if !parts.iter().any(|p| p == &rendered) {
                        parts.push(rendered);
                    }
                }
            }

            let mut flags = parts.join(", ");

            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                flags.push_str(&format!(" <{value_name}>"));
            }

            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');

            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }

            out.push('\n');
        }
    }

    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    command: Command,
    data: Option<String>,
    store_path: PathBuf,
    config_path: Option<PathBuf>,
    timeout: u64,
    settings: PipelineSettings,
    query: String,
    output: Option<String>,
    output_format: OutputFormat,
    offline_cache: Option<PathBuf>,
    cache_version: String,
    cache_strategy: CacheStrategy,
    assets: Vec<String>,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout in config, expected positive integer".to_string());
    }

    let data = args
        .data
        .or(cfg.data)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let store_path = args
        .store
        .or(cfg.store)
        .map(|p| config::expand_tilde(&p))
        .unwrap_or_else(config::default_store_path);

    let command = args
        .command
        .unwrap_or_else(|| Command::Render(Default::default()));

    let render = match &command {
        Command::Render(render) => render.clone(),
        _ => Default::default(),
    };

    let suggestion_limit = render
        .suggestions
        .or(cfg.suggestions)
        .unwrap_or(pipeline::DEFAULT_SUGGESTION_LIMIT);
    let fuzzy_threshold = match render.fuzzy_threshold.as_deref() {
        Some(raw) => crate::utils::parse_fuzzy_threshold(raw)?,
        None => match cfg.fuzzy_threshold {
            Some(value) => crate::utils::parse_fuzzy_threshold(&value.to_string())
                .map_err(|e| format!("invalid fuzzy_threshold in config: {e}"))?,
            None => crate::utils::DEFAULT_FUZZY_THRESHOLD,
        },
    };

    let output = render.output.clone();
    let output_format = match render.output_format.as_deref() {
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid --output-format '{raw}'"))?,
        None => match output.as_deref().and_then(output::infer_format_from_path) {
            Some(format) => format,
            None => match cfg.output_format.as_deref() {
                Some(raw) => OutputFormat::parse(raw)
                    .ok_or_else(|| format!("invalid output_format '{raw}' in config"))?,
                None => OutputFormat::Text,
            },
        },
    };

    let cache_strategy = match args.cache_strategy.or(cfg.cache_strategy) {
        Some(raw) => CacheStrategy::parse(&raw)
            .ok_or_else(|| format!("invalid cache strategy '{raw}'"))?,
        None => CacheStrategy::default(),
    };

    let offline_cache = args
        .offline_cache
        .or(cfg.offline_cache)
        .map(|p| config::expand_tilde(&p));
    let cache_version = cfg
        .cache_version
        .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string());

    let mut assets: Vec<String> = cfg
        .assets
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if let Some(DataSource::Url(url)) = data.as_deref().map(DataSource::detect) {
        if !assets.contains(&url) {
            assets.insert(0, url);
        }
    }

    Ok(RunConfig {
        command,
        data,
        store_path,
        config_path: args.config.map(|p| config::expand_tilde(&p)),
        timeout,
        settings: PipelineSettings {
            suggestion_limit,
            fuzzy_threshold,
        },
        query: render.query.unwrap_or_default(),
        output,
        output_format,
        offline_cache,
        cache_version,
        cache_strategy,
        assets,
        no_color,
        verbose: args.verbose,
    })
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "linkhub=debug",
        _ => "linkhub=trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Translates a subcommand into the actions it dispatches, in order.
fn command_actions(command: &Command, query: &str) -> Result<Vec<Action>, String> {
    let actions = match command {
        Command::Render(_) => vec![Action::SetQuery(query.to_string())],
        Command::Fav { id } => vec![Action::ToggleFavourite(id.trim().to_string())],
        Command::Open { id } => vec![Action::OpenItem(id.trim().to_string())],
        Command::Chip { chip } => vec![match chip {
            ChipArg::Favs => Action::ToggleFavouritesOnly,
            ChipArg::Internal => Action::ToggleVisibility(Visibility::Internal),
            ChipArg::External => Action::ToggleVisibility(Visibility::External),
        }],
        Command::SmartSearch => vec![Action::ToggleSmartSearch],
        Command::Theme { theme: None } => vec![Action::ToggleTheme],
        Command::Theme { theme: Some(raw) } => {
            let theme = Theme::parse(raw).ok_or_else(|| format!("invalid theme '{raw}'"))?;
            vec![Action::SetTheme(theme)]
        }
        Command::Accent { accent, shift } => {
            let mut actions = Vec::new();
            if let Some(raw) = accent.as_deref() {
                actions.push(Action::SetAccent(Accent::parse(raw)?));
            }
            if let Some(shift) = shift {
                actions.push(Action::SetAccentShift(*shift));
            }
            actions
        }
        Command::View { view } => {
            let view = ViewMode::parse(view).ok_or_else(|| format!("invalid view '{view}'"))?;
            vec![Action::SetView(view)]
        }
        Command::Compact { state } => vec![Action::SetCompact(*state == SwitchArg::On)],
        Command::Sidebar => vec![Action::ToggleSidebar],
        Command::Sections { op } => vec![match op {
            SectionsOp::Expand => Action::ExpandAll,
            SectionsOp::Collapse => Action::CollapseAll,
            SectionsOp::Open { id } => Action::SetSectionOpen {
                id: id.trim().to_string(),
                open: true,
            },
            SectionsOp::Close { id } => Action::SetSectionOpen {
                id: id.trim().to_string(),
                open: false,
            },
        }],
        Command::Prefs { reset: true } => vec![Action::ResetPreferences],
        Command::Prefs { reset: false } | Command::Cache { .. } | Command::InitConfig => {
            Vec::new()
        }
    };
    Ok(actions)
}

/// Preference-only commands run against an empty document.
fn needs_document(command: &Command) -> bool {
    matches!(
        command,
        Command::Render(_) | Command::Fav { .. } | Command::Open { .. } | Command::Sections { .. }
    )
}

fn fetch_spinner(enabled: bool, source: &DataSource) -> Result<ProgressBar, String> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(format!("loading {}", source.describe()));
    Ok(pb)
}

fn offline_cache(run: &RunConfig) -> Option<OfflineCache> {
    run.offline_cache
        .as_ref()
        .map(|root| OfflineCache::new(root.clone(), run.cache_version.clone()))
}

async fn load(run: &RunConfig, client: &reqwest::Client) -> Result<Document, String> {
    let data = run
        .data
        .as_deref()
        .ok_or_else(|| "no link document configured, pass --data or set 'data' in the config".to_string())?;
    let source = DataSource::detect(data);
    let cache = offline_cache(run);
    let options = LoadOptions {
        cache: cache.as_ref().map(|c| (c, run.cache_strategy)),
    };

    let show_spinner = run.verbose > 0
        && run.output_format == OutputFormat::Text
        && matches!(source, DataSource::Url(_));
    let pb = fetch_spinner(show_spinner, &source)?;
    let result = loader::load_document(client, &source, options).await;
    pb.finish_and_clear();
    result.map_err(|e| e.to_string())
}

async fn write_rendered(run: &RunConfig, body: &[u8]) -> Result<(), String> {
    match run.output.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            tokio::fs::write(&path, body)
                .await
                .map_err(|e| format!("failed to write output '{}': {e}", path.display()))?;
            tracing::debug!(path = %path.display(), bytes = body.len(), "wrote rendered hub");
            Ok(())
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body)
                .and_then(|_| stdout.flush())
                .map_err(|e| format!("failed to write output: {e}"))
        }
    }
}

fn print_preferences(prefs: &Preferences) {
    format_kv_line("Theme", prefs.theme.as_str());
    format_kv_line(
        "Accent",
        &format!("{} (shift {})", prefs.accent.token(), prefs.accent_shift),
    );
    format_kv_line("View", prefs.view.as_str());
    format_kv_line("Compact", format_bool(prefs.compact));
    format_kv_line("Sidebar", if prefs.sidebar_collapsed { "collapsed" } else { "expanded" });
    format_kv_line("Smart", format_bool(prefs.smart_search));
    let vis: Vec<&str> = prefs.filters.vis.iter().map(|v| v.as_str()).collect();
    format_kv_line(
        "Filters",
        &format!(
            "favourites-only {} / visibility [{}]",
            format_bool(prefs.filters.only_favs),
            vis.join(",")
        ),
    );
    let favs: Vec<&str> = prefs.favourites.iter().map(|s| s.as_str()).collect();
    format_kv_line("Favourites", &favs.join(", "));
    let open: Vec<&str> = prefs.open_sections.iter().map(|s| s.as_str()).collect();
    format_kv_line("Open", &open.join(", "));
    format_kv_line("Usage", &format!("{} items tracked", prefs.usage.len()));
}

fn report_change(command: &Command, prefs: &Preferences) {
    match command {
        Command::Chip { .. } => {
            let vis: Vec<&str> = prefs.filters.vis.iter().map(|v| v.as_str()).collect();
            format_kv_line("Favs only", format_bool(prefs.filters.only_favs));
            format_kv_line("Visibility", &vis.join(","));
        }
        Command::SmartSearch => format_kv_line("Smart", format_bool(prefs.smart_search)),
        Command::Theme { .. } => format_kv_line("Theme", prefs.theme.as_str()),
        Command::Accent { .. } => {
            let attrs =
                crate::theme::theme_attributes(prefs.theme, &prefs.accent, prefs.accent_shift);
            format_kv_line("Accent", prefs.accent.token());
            format_kv_line("Shift", &prefs.accent_shift.to_string());
            format_kv_line("Strong", &attrs.accent_strong);
        }
        Command::View { .. } => format_kv_line("View", prefs.view.as_str()),
        Command::Compact { .. } => format_kv_line("Compact", format_bool(prefs.compact)),
        Command::Sidebar => format_kv_line(
            "Sidebar",
            if prefs.sidebar_collapsed {
                "collapsed"
            } else {
                "expanded"
            },
        ),
        Command::Sections { .. } => {
            let open: Vec<&str> = prefs.open_sections.iter().map(|s| s.as_str()).collect();
            format_kv_line("Open", &open.join(", "));
        }
        Command::Prefs { .. } => print_preferences(prefs),
        _ => {}
    }
}

async fn run_cache(run: &RunConfig, client: &reqwest::Client, op: &CacheOp) -> Result<(), String> {
    let cache = offline_cache(run).ok_or_else(|| {
        "no offline cache configured, pass --offline-cache or set 'offline_cache'".to_string()
    })?;
    format_kv_line("Cache", &cache.root().display().to_string());
    format_kv_line("Version", cache.version());
    match op {
        CacheOp::Install => {
            if run.assets.is_empty() {
                return Err("nothing to install, no remote data or assets configured".to_string());
            }
            let stored = cache
                .install(client, &run.assets)
                .await
                .map_err(|e| e.to_string())?;
            format_kv_line("Installed", &format!("{stored} assets"));
        }
        CacheOp::Activate => {
            let removed = cache.activate().await.map_err(|e| e.to_string())?;
            if removed.is_empty() {
                format_kv_line("Removed", "none");
            } else {
                format_kv_line("Removed", &removed.join(", "));
            }
        }
        CacheOp::Clear => {
            cache.clear().await.map_err(|e| e.to_string())?;
            format_kv_line("Cleared", cache.version());
        }
    }
    Ok(())
}

fn init_config(run: &RunConfig) -> Result<(), String> {
    let path = match run.config_path.clone() {
        Some(path) => path,
        None => config::default_config_path()
            .ok_or_else(|| "could not determine home directory for config".to_string())?,
    };
    let created = config::ensure_default_config_file(&path)?;
    let state = if created { "created" } else { "already exists" };
    format_kv_line("Config", &format!("{} ({state})", path.display()));
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color || (run.output.is_some() && run.output_format == OutputFormat::Text) {
        colored::control::set_override(false);
    }

    if let Command::InitConfig = run.command {
        return init_config(&run);
    }

    let client = loader::build_client(run.timeout).map_err(|e| e.to_string())?;

    if let Command::Cache { op } = &run.command {
        return run_cache(&run, &client, op).await;
    }

    let store = PreferenceStore::new(FileStore::open_or_empty(run.store_path.clone()));
    let now = Instant::now();

    let document = if needs_document(&run.command) {
        match load(&run, &client).await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(error = %e, "failed to load link document");
                if let Command::Render(_) = run.command {
                    let view = pipeline::error_view(&store.load());
                    write_rendered(&run, &output::render(&view, run.output_format)).await?;
                }
                return Err(e);
            }
        }
    } else {
        Document::default()
    };

    let mut session = Session::new(document, store, run.settings);
    for action in command_actions(&run.command, &run.query)? {
        match session.dispatch(action).map_err(|e| e.to_string())? {
            Outcome::Open { url } => println!("{url}"),
            Outcome::FavouriteToggled { id, favourite } => {
                let title = session
                    .document()
                    .find_item(&id)
                    .map(|item| item.title.clone());
                if title.is_none() {
                    tracing::warn!(%id, "favourite id does not match a loaded item");
                }
                let state = if favourite {
                    "added".green()
                } else {
                    "removed".yellow()
                };
                format_kv_line(
                    "Favourite",
                    &format!("{} ({state})", title.unwrap_or(id)),
                );
            }
            Outcome::Updated => {}
        }
    }

    if let Command::Render(_) = run.command {
        let view = session.view();
        write_rendered(&run, &output::render(&view, run.output_format)).await?;
        tracing::debug!(
            shown = view.total_shown,
            total = view.total_all,
            elapsed_ms = now.elapsed().as_millis() as u64,
            "rendered hub"
        );
        if let Some(path) = run.output.as_deref() {
            if run.verbose > 0 {
                eprintln!(
                    ":: Saved {} of {} items to {}",
                    view.total_shown, view.total_all, path
                );
            }
        }
    } else {
        report_change(&run.command, session.preferences());
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);

    let cfg = match args.config.as_deref().map(config::expand_tilde) {
        Some(path) => config::load_config(&path, matches!(args.command, Some(Command::InitConfig)))?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
