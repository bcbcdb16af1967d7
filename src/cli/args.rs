use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "linkhub",
    version,
    about = "searchable resource hub for grouped links",
    long_about = "linkhub loads a JSON document of link groups, renders it as searchable sections of cards, and keeps your favourites, theme and filters between runs.\n\nExamples:\n  linkhub -d ./data/links.json render -q api\n  linkhub -d https://example.com/links.json render -A html -o hub.html\n  linkhub fav auto_1a2b3c4d\n  linkhub theme dark\n\nTip: Use --config to persist the data source and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.linkhub/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'd',
        long = "data",
        visible_alias = "links",
        value_name = "PATH|URL",
        global = true,
        help_heading = "Input",
        help = "Link document to load (local path or http(s) URL)."
    )]
    pub data: Option<String>,

    #[arg(
        long = "store",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Preference store file (defaults to ~/.linkhub/storage.json)."
    )]
    pub store: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "oc",
        visible_alias = "offline-cache",
        value_name = "DIR",
        global = true,
        help_heading = "Cache",
        help = "Directory for the offline cache of remote documents."
    )]
    pub offline_cache: Option<String>,

    #[arg(
        long = "cs",
        visible_alias = "cache-strategy",
        value_name = "STRATEGY",
        global = true,
        help_heading = "Cache",
        help = "Cache strategy for remote documents (cache-first or network-first)."
    )]
    pub cache_strategy: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the hub (default when no subcommand is given).
    Render(RenderArgs),
    /// Toggle an item in favourites.
    Fav {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Record a click on an item and print its URL.
    Open {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Toggle a filter chip.
    Chip {
        #[arg(value_enum)]
        chip: ChipArg,
    },
    /// Toggle fuzzy (smart) search.
    SmartSearch,
    /// Set the theme, or toggle light/dark when no value is given.
    Theme {
        #[arg(value_name = "THEME")]
        theme: Option<String>,
    },
    /// Set the accent color (palette name or #hex).
    Accent {
        #[arg(value_name = "ACCENT")]
        accent: Option<String>,
        #[arg(
            long = "shift",
            value_name = "N",
            allow_hyphen_values = true,
            help = "Brightness shift for the strong accent (-50..50)."
        )]
        shift: Option<i32>,
    },
    /// Set the default layout.
    View {
        #[arg(value_name = "VIEW")]
        view: String,
    },
    /// Turn compact mode on or off.
    Compact {
        #[arg(value_enum)]
        state: SwitchArg,
    },
    /// Toggle the collapsed sidebar.
    Sidebar,
    /// Expand, collapse, open or close sections.
    Sections {
        #[command(subcommand)]
        op: SectionsOp,
    },
    /// Show stored preferences.
    Prefs {
        #[arg(long = "reset", help = "Clear every stored preference.")]
        reset: bool,
    },
    /// Manage the offline cache.
    Cache {
        #[command(subcommand)]
        op: CacheOp,
    },
    /// Write the default config file.
    InitConfig,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RenderArgs {
    #[arg(
        short = 'q',
        long = "query",
        value_name = "TEXT",
        help = "Search text (matched against title and notes)."
    )]
    pub query: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help = "Output format (text, json, html)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help = "Write the rendered hub to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "suggestions",
        value_name = "N",
        help = "How many most-used items to suggest."
    )]
    pub suggestions: Option<usize>,

    #[arg(
        long = "ft",
        visible_alias = "fuzzy-threshold",
        value_name = "0..1",
        help = "Fuzzy match threshold for smart search."
    )]
    pub fuzzy_threshold: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipArg {
    Favs,
    Internal,
    External,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchArg {
    On,
    Off,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SectionsOp {
    Expand,
    Collapse,
    Open { id: String },
    Close { id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheOp {
    /// Fetch and store every configured asset.
    Install,
    /// Delete cache generations other than the current one.
    Activate,
    /// Delete the current generation.
    Clear,
}
