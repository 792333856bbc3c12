//! fontbrowse CLI

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fontbrowse_core::catalog::Family;
use fontbrowse_core::discovery::FontFolder;
use fontbrowse_core::features::FeatureFacet;
use fontbrowse_core::filter::{FilterEngine, FilterOutcome};
use fontbrowse_core::output::{
    font_records, write_details_json, write_facets_json, write_json_pretty, write_ndjson,
};
use fontbrowse_core::query::{
    parse_codepoint_list, parse_feature_setting, ActiveFeatures, SearchAndFilterOptions,
};
use fontbrowse_core::reader::FontationsReader;
use fontbrowse_core::session::{RebuildOutcome, Session};
use fontbrowse_core::settings::{JsonSettingsStore, Settings, SettingsStore};

/// CLI entrypoint for fontbrowse.
#[derive(Debug, Parser)]
#[command(name = "fontbrowse", about = "Browse, search and tag the fonts on this machine")]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Settings file (defaults to $FONTBROWSE_SETTINGS or the config dir)
    #[arg(long = "settings", global = true, value_hint = ValueHint::FilePath)]
    settings: Option<PathBuf>,

    /// Extra folder to scan for this run only (recursive)
    #[arg(long = "folder", global = true, value_hint = ValueHint::DirPath)]
    folders: Vec<PathBuf>,

    /// Skip the platform font folders
    #[arg(long = "no-system-fonts", global = true, action = ArgAction::SetTrue)]
    no_system_fonts: bool,

    /// Worker threads for scanning and parsing
    #[arg(short = 'j', long = "jobs", global = true)]
    jobs: Option<usize>,

    /// Log debug output to stderr
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List fonts matching the filters, grouped by family
    List(ListArgs),
    /// List the OpenType features offered by the matching fonts
    Features(FeaturesArgs),
    /// Show the features and characters of one font
    Details(DetailsArgs),
    /// Manage configured font folders
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Manage user tags
    Tags {
        #[command(subcommand)]
        action: TagAction,
    },
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Case-insensitive substring of the full font name
    #[arg(short = 's', long = "search")]
    search: Option<String>,

    /// Require fonts to cover every character of this text
    #[arg(short = 't', long = "chars")]
    chars: Option<String>,

    /// Unicode codepoints or ranges (e.g. U+0041-U+0044,B)
    #[arg(short = 'u', long = "codepoints", value_delimiter = ',', value_hint = ValueHint::Other)]
    codepoints: Vec<String>,

    /// Only fonts carrying one of these user tags
    #[arg(long = "include-tag")]
    include_tags: Vec<String>,

    /// Hide fonts carrying any of these user tags
    #[arg(long = "exclude-tag")]
    exclude_tags: Vec<String>,

    /// Select a feature: tag, tag=on or tag=off
    #[arg(short = 'f', long = "feature", value_hint = ValueHint::Other)]
    features: Vec<String>,

    /// Only fonts supporting a selected feature
    #[arg(long = "selected-features-only", action = ArgAction::SetTrue)]
    selected_features_only: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Emit a single JSON array of families
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit one JSON object per font
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Format output as padded columns
    #[arg(long = "columns", action = ArgAction::SetTrue)]
    columns: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct FeaturesArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Include features normally hidden from users
    #[arg(long = "secret", action = ArgAction::SetTrue)]
    secret: bool,

    /// Emit JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct DetailsArgs {
    /// Full name of the font, as shown by `list`
    full_name: String,

    /// Include features normally hidden from users
    #[arg(long = "secret", action = ArgAction::SetTrue)]
    secret: bool,

    /// Emit JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum FolderAction {
    /// Show configured folders
    List,
    /// Add a folder
    Add {
        #[arg(value_hint = ValueHint::DirPath)]
        path: PathBuf,
        /// Also scan subfolders
        #[arg(short = 'r', long = "recursive", action = ArgAction::SetTrue)]
        recursive: bool,
    },
    /// Remove a folder
    Remove {
        #[arg(value_hint = ValueHint::DirPath)]
        path: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum TagAction {
    /// Tag a font
    Add { full_name: String, tag: String },
    /// Untag a font
    Remove { full_name: String, tag: String },
    /// Show the tags of one font, or every tag in use
    List {
        full_name: Option<String>,
        /// Only tags containing this text
        #[arg(long = "suggest")]
        suggest: Option<String>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Parse CLI args and execute the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    execute(cli).await
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

async fn execute(cli: Cli) -> Result<()> {
    configure_jobs(cli.global.jobs)?;
    let store = Arc::new(JsonSettingsStore::locate(cli.global.settings.clone())?);
    debug!(settings = %store.path().display(), "using settings file");

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let tty = handle.is_terminal();

    match cli.command {
        Command::List(args) => run_list(&cli.global, store, args, &mut handle, tty).await,
        Command::Features(args) => run_features(&cli.global, store, args, &mut handle).await,
        Command::Details(args) => run_details(&cli.global, store, args, &mut handle).await,
        Command::Folders { action } => run_folders(store.as_ref(), action, &mut handle),
        Command::Tags { action } => run_tags(store.as_ref(), action, &mut handle),
    }
}

fn configure_jobs(jobs: Option<usize>) -> Result<()> {
    match jobs {
        None => Ok(()),
        Some(0) => bail!("--jobs must be at least 1"),
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker threads"),
    }
}

async fn open_session(global: &GlobalArgs, store: Arc<JsonSettingsStore>) -> Result<Session> {
    let extra = global.folders.iter().map(|p| FontFolder::new(p, true));
    let session = Session::new(store, Arc::new(FontationsReader::new()))?
        .include_system_fonts(!global.no_system_fonts)
        .with_extra_folders(extra);

    match session.rebuild().await? {
        RebuildOutcome::Published(catalog) => {
            debug!(families = catalog.len(), "catalog ready");
        }
        RebuildOutcome::Superseded => bail!("catalog rebuild was superseded"),
    }
    Ok(session)
}

fn build_filter(args: &FilterArgs) -> Result<(SearchAndFilterOptions, ActiveFeatures)> {
    let mut chars: Vec<char> = args.chars.as_deref().unwrap_or("").chars().collect();
    for chunk in &args.codepoints {
        chars.extend(parse_codepoint_list(chunk)?);
    }
    dedup_chars(&mut chars);

    let mut options = SearchAndFilterOptions::new()
        .with_included_tags(args.include_tags.iter().map(|t| t.trim().to_string()))
        .with_excluded_tags(args.exclude_tags.iter().map(|t| t.trim().to_string()))
        .selected_features_only(args.selected_features_only);
    if let Some(term) = args.search.as_deref().filter(|t| !t.is_empty()) {
        options = options.with_search_term(term);
    }
    if !chars.is_empty() {
        options = options.with_characters(chars.into_iter().collect::<String>());
    }

    let mut active = ActiveFeatures::new();
    for raw in &args.features {
        let (tag, state) = parse_feature_setting(raw)
            .with_context(|| format!("invalid --feature value: {raw}"))?;
        active.set(tag.trim_end(), Some(state));
    }

    Ok((options, active))
}

fn dedup_chars(cps: &mut Vec<char>) {
    cps.sort();
    cps.dedup();
}

fn needs_details(options: &SearchAndFilterOptions, active: &ActiveFeatures) -> bool {
    options.characters.as_deref().is_some_and(|c| !c.is_empty())
        || (options.selected_features_only && !active.is_empty())
}

async fn filtered(
    global: &GlobalArgs,
    store: Arc<JsonSettingsStore>,
    filter: &FilterArgs,
) -> Result<(Session, Arc<FilterOutcome>)> {
    let (options, active) = build_filter(filter)?;
    let settings = store.load()?;
    let session = open_session(global, store).await?;
    if needs_details(&options, &active) {
        session.preload_all().await;
    }

    let mut engine = FilterEngine::new();
    let outcome = session.filter(&mut engine, &options, &active, &settings.tags);
    Ok((session, outcome))
}

async fn run_list(
    global: &GlobalArgs,
    store: Arc<JsonSettingsStore>,
    args: ListArgs,
    mut w: impl Write,
    tty: bool,
) -> Result<()> {
    let (_, outcome) = filtered(global, store, &args.filter).await?;
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => tty,
    };

    if args.ndjson {
        write_ndjson(&outcome.families, &mut w)?;
    } else if args.json {
        write_json_pretty(&outcome.families, &mut w)?;
    } else if args.columns {
        write_columns(&outcome.families, &mut w, use_color)?;
    } else {
        write_plain(&outcome.families, &mut w, use_color)?;
    }
    Ok(())
}

async fn run_features(
    global: &GlobalArgs,
    store: Arc<JsonSettingsStore>,
    args: FeaturesArgs,
    mut w: impl Write,
) -> Result<()> {
    let (session, outcome) = filtered(global, store, &args.filter).await?;
    session
        .preload(outcome.displayed_font_names.iter().map(String::as_str))
        .await;
    let facets = session.facets(&outcome, args.secret);

    if args.json {
        write_facets_json(&facets, &mut w)?;
    } else {
        write_facet_lines(&facets, &mut w)?;
    }
    Ok(())
}

async fn run_details(
    global: &GlobalArgs,
    store: Arc<JsonSettingsStore>,
    args: DetailsArgs,
    mut w: impl Write,
) -> Result<()> {
    let session = open_session(global, store).await?;
    let details = session
        .font_details(&args.full_name)
        .await
        .ok_or_else(|| anyhow!("no font named {:?} in the catalog", args.full_name))?;

    if args.json {
        return write_details_json(&args.full_name, &details, &mut w);
    }
    if details.is_unavailable() {
        writeln!(w, "{}: details unavailable", args.full_name)?;
        return Ok(());
    }

    let features = session
        .facet_index()
        .features_for(&args.full_name, session.details().as_ref(), args.secret);
    writeln!(w, "{}", args.full_name)?;
    writeln!(w, "features:")?;
    write_facet_lines(&features, &mut w)?;
    writeln!(w, "characters:")?;
    writeln!(w, "{}", details.character_string.as_deref().unwrap_or(""))?;
    Ok(())
}

fn run_folders(store: &dyn SettingsStore, action: FolderAction, mut w: impl Write) -> Result<()> {
    match action {
        FolderAction::List => {
            for folder in store.get_folders()? {
                write_folder(&folder, &mut w)?;
            }
        }
        FolderAction::Add { path, recursive } => {
            let path = std::fs::canonicalize(&path)
                .with_context(|| format!("cannot add folder {}", path.display()))?;
            let folder = FontFolder::new(path, recursive);
            store.update(&mut |s: &mut Settings| s.add_folder(folder.clone()))?;
            write_folder(&folder, &mut w)?;
        }
        FolderAction::Remove { path } => {
            let mut removed = false;
            let canonical = std::fs::canonicalize(&path).ok();
            store.update(&mut |s: &mut Settings| {
                removed = s.remove_folder(&path)
                    || canonical.as_deref().is_some_and(|c| s.remove_folder(c));
            })?;
            if !removed {
                bail!("{} is not a configured folder", path.display());
            }
        }
    }
    Ok(())
}

fn write_folder(folder: &FontFolder, mut w: impl Write) -> Result<()> {
    let suffix = if folder.recursive { " (recursive)" } else { "" };
    writeln!(w, "{}{suffix}", folder.path.display())?;
    Ok(())
}

fn run_tags(store: &dyn SettingsStore, action: TagAction, mut w: impl Write) -> Result<()> {
    match action {
        TagAction::Add { full_name, tag } => {
            if tag.trim().is_empty() {
                bail!("tag must not be blank");
            }
            let settings = store.update(&mut |s: &mut Settings| {
                s.tags.add(full_name.clone(), &tag);
            })?;
            write_tag_list(settings.tags.get(&full_name).unwrap_or(&[]), &mut w)?;
        }
        TagAction::Remove { full_name, tag } => {
            let mut removed = false;
            store.update(&mut |s: &mut Settings| removed = s.tags.remove(&full_name, &tag))?;
            if !removed {
                bail!("{full_name:?} is not tagged {tag:?}");
            }
        }
        TagAction::List { full_name, suggest } => {
            let tags = store.load()?.tags;
            let listed = match (&full_name, &suggest) {
                (Some(name), _) => tags.get(name).map(<[String]>::to_vec).unwrap_or_default(),
                (None, Some(input)) => tags.suggestions(input),
                (None, None) => tags.all_tags(),
            };
            write_tag_list(&listed, &mut w)?;
        }
    }
    Ok(())
}

fn write_tag_list(tags: &[String], mut w: impl Write) -> Result<()> {
    for tag in tags {
        writeln!(w, "{tag}")?;
    }
    Ok(())
}

fn write_facet_lines(facets: &[FeatureFacet], mut w: impl Write) -> Result<()> {
    for facet in facets {
        let name = facet.info.friendly_name.as_deref().unwrap_or(&facet.tag);
        writeln!(w, "{:<4}  {name}", facet.tag)?;
    }
    Ok(())
}

fn write_plain(families: &[Family], mut w: impl Write, color: bool) -> Result<()> {
    for family in families {
        writeln!(w, "{}", apply_color(&family.name, color, AnsiColor::Yellow))?;
        for shown in family.display_fonts() {
            let extra = shown.files.len() - 1;
            if extra > 0 {
                writeln!(w, "  {} (+{extra} duplicate)", shown.font.full_name)?;
            } else {
                writeln!(w, "  {}", shown.font.full_name)?;
            }
        }
    }
    Ok(())
}

fn write_columns(families: &[Family], mut w: impl Write, color: bool) -> Result<()> {
    let rows: Vec<(&str, &str, &str)> = font_records(families)
        .into_iter()
        .map(|r| {
            (
                r.font.full_name.as_str(),
                r.font.subfamily_name.as_str(),
                r.font.file.as_str(),
            )
        })
        .collect();

    let name_width = rows
        .iter()
        .map(|r| r.0.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(0, 80);
    let style_width = rows
        .iter()
        .map(|r| r.1.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(0, 40);

    for (name, style, file) in rows {
        let padded_name = format!("{:<name_width$}", name);
        let padded_style = format!("{:<style_width$}", style);
        let rendered_name = apply_color(&padded_name, color, AnsiColor::Yellow);
        let rendered_style = apply_color(&padded_style, color, AnsiColor::Green);
        let rendered_file = apply_color(file, color, AnsiColor::Cyan);

        writeln!(w, "{rendered_name}  {rendered_style}  {rendered_file}")?;
    }

    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Cyan,
    Yellow,
    Green,
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Cyan => "36",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}
