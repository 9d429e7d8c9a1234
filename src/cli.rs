use crate::{
    app::{App, Session, StartupOptions},
    config::AppPaths,
    filter::ViewFilter,
    logging::{self, Verbosity},
    mode::Mode,
    progress::Progress,
    storage::FileStore,
    tracker::{SaveStatus, Tracker},
    ui,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GlobalOptions {
    format: OutputFormat,
    catalog: Option<String>,
    verbosity: Verbosity,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            catalog: None,
            verbosity: Verbosity::Normal,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui(GlobalOptions),
    Command {
        command: CliCommand,
        global: GlobalOptions,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    List(ListOptions),
    Progress,
    Categories,
    Activate { id: String, mode: Mode },
    SelectAll,
    SelectNone,
    Export,
    Import(TokenInput),
    Paths,
    Help,
    Version,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ListOptions {
    search: Option<String>,
    category: Option<String>,
    view: ViewFilter,
}

#[derive(Debug, PartialEq, Eq)]
enum TokenInput {
    Inline(String),
    Stdin,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Ui(global) => run_ui(global),
        CliAction::Command { command, global } => match command {
            CliCommand::Help => {
                print_help();
                Ok(())
            }
            CliCommand::Version => {
                println!("dokkan-checklist v{}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            _ => {
                if let Err(err) = logging::init_stderr(global.verbosity) {
                    eprintln!("warning: {err:#}");
                }
                let paths = AppPaths::resolve()?;
                run_command(&paths, command, &global)
            }
        },
    }
}

fn run_ui(global: GlobalOptions) -> Result<()> {
    let paths = AppPaths::resolve()?;
    if let Err(err) = logging::init_file(&paths.log_file(), global.verbosity) {
        eprintln!("warning: {err:#}");
    }
    let options = StartupOptions {
        catalog: global.catalog,
    };
    let mut app = match App::initialize(paths, options) {
        Ok(app) => app,
        Err(err) => {
            tracing::error!("startup failed: {err:#}");
            ui::run_fatal(&err)?;
            return Err(err);
        }
    };
    ui::run(&mut app)?;
    if app.tracker.has_unsaved_changes() {
        eprintln!("warning: the last changes could not be saved");
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    if matches!(args.first().map(|s| s.as_str()), Some("--help" | "-h" | "help")) {
        return Ok(command(CliCommand::Help, GlobalOptions::default()));
    }
    if matches!(args.first().map(|s| s.as_str()), Some("--version" | "-V" | "version")) {
        return Ok(command(CliCommand::Version, GlobalOptions::default()));
    }

    let (global, tokens) = parse_global_options(args)?;
    let Some(head) = tokens.first() else {
        return Ok(CliAction::Ui(global));
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let parsed = match head.as_str() {
        "list" => CliCommand::List(parse_list(rest)?),
        "progress" => CliCommand::Progress,
        "categories" => CliCommand::Categories,
        "activate" => parse_activate(rest)?,
        "select-all" => CliCommand::SelectAll,
        "select-none" => CliCommand::SelectNone,
        "export" => CliCommand::Export,
        "import" => {
            let token = rest
                .first()
                .ok_or_else(|| anyhow::anyhow!("import requires a code (or '-' for stdin)"))?;
            if token == "-" {
                CliCommand::Import(TokenInput::Stdin)
            } else {
                CliCommand::Import(TokenInput::Inline(token.to_string()))
            }
        }
        "paths" => CliCommand::Paths,
        other => bail!("Unknown command: {other} (see --help)"),
    };
    Ok(command(parsed, global))
}

fn command(command: CliCommand, global: GlobalOptions) -> CliAction {
    CliAction::Command { command, global }
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut global = GlobalOptions::default();
    let mut verbose = false;
    let mut quiet = false;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            global.format = parse_format(value)?;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--catalog=") {
            global.catalog = Some(value.to_string());
            continue;
        }
        match arg.as_str() {
            "--format" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--format requires a value"))?;
                global.format = parse_format(value)?;
            }
            "--catalog" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--catalog requires a path or URL"))?;
                global.catalog = Some(value.to_string());
            }
            "-v" | "--verbose" => verbose = true,
            "-q" | "--quiet" => quiet = true,
            _ => tokens.push(arg.to_string()),
        }
    }
    global.verbosity = Verbosity::from_flags(verbose, quiet);
    Ok((global, tokens))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value).ok_or_else(|| anyhow::anyhow!("Unknown format: {value}"))
}

fn parse_list(args: &[String]) -> Result<ListOptions> {
    let mut options = ListOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--search requires a value"))?;
                options.search = Some(value.to_string());
            }
            value if value.starts_with("--search=") => {
                options.search = Some(value.trim_start_matches("--search=").to_string());
            }
            "--category" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--category requires a value"))?;
                options.category = Some(value.to_string());
            }
            value if value.starts_with("--category=") => {
                options.category = Some(value.trim_start_matches("--category=").to_string());
            }
            "--view" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--view requires a value"))?;
                options.view = parse_view(value)?;
            }
            value if value.starts_with("--view=") => {
                options.view = parse_view(value.trim_start_matches("--view="))?;
            }
            other => bail!("Unknown list option: {other}"),
        }
    }
    Ok(options)
}

fn parse_view(value: &str) -> Result<ViewFilter> {
    ViewFilter::parse(value).ok_or_else(|| {
        anyhow::anyhow!("Unknown view: {value} (use 'all', 'hide-owned', or 'missing')")
    })
}

fn parse_activate(args: &[String]) -> Result<CliCommand> {
    let mut id = None;
    let mut mode = Mode::Owned;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mode" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--mode requires a value"))?;
                mode = parse_mode(value)?;
            }
            value if value.starts_with("--mode=") => {
                mode = parse_mode(value.trim_start_matches("--mode="))?;
            }
            value if id.is_none() => id = Some(value.to_string()),
            other => bail!("Unexpected argument: {other}"),
        }
    }
    let id = id.ok_or_else(|| anyhow::anyhow!("activate requires a unit id"))?;
    Ok(CliCommand::Activate { id, mode })
}

fn parse_mode(value: &str) -> Result<Mode> {
    Mode::parse(value)
        .ok_or_else(|| anyhow::anyhow!("Unknown mode: {value} (use 'owned', 'eza', or 'pot')"))
}

fn run_command(paths: &AppPaths, command: CliCommand, global: &GlobalOptions) -> Result<()> {
    if command == CliCommand::Paths {
        return list_paths(paths, global);
    }

    let session = Session::open(paths, global.catalog.as_deref())?;
    for warning in &session.warnings {
        tracing::warn!("saved state: {warning}");
    }
    let mut tracker = session.tracker;
    let format = global.format;
    match command {
        CliCommand::List(options) => list_units(&mut tracker, options, format),
        CliCommand::Progress => print_progress(tracker.progress(), format),
        CliCommand::Categories => list_categories(&tracker, format),
        CliCommand::Activate { id, mode } => activate_unit(&mut tracker, &id, mode, format),
        CliCommand::SelectAll => {
            report_save(tracker.select_all());
            print_progress(tracker.progress(), format)
        }
        CliCommand::SelectNone => {
            report_save(tracker.select_none());
            print_progress(tracker.progress(), format)
        }
        CliCommand::Export => {
            let token = tracker.export_state().context("serialize export code")?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "code": token }));
                }
                OutputFormat::Text => println!("{token}"),
            }
            Ok(())
        }
        CliCommand::Import(input) => {
            let token = match input {
                TokenInput::Inline(token) => token,
                TokenInput::Stdin => {
                    let mut raw = String::new();
                    std::io::stdin()
                        .read_to_string(&mut raw)
                        .context("read import code from stdin")?;
                    raw
                }
            };
            match tracker.import_state(&token) {
                Ok(save) => {
                    report_save(save);
                    print_progress(tracker.progress(), format)
                }
                Err(err) => {
                    tracing::debug!(reason = err.reason(), "import rejected");
                    bail!("Invalid import code.")
                }
            }
        }
        CliCommand::Paths | CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn report_save(save: SaveStatus) {
    if let Some(warning) = save.warning() {
        tracing::warn!("progress not saved: {warning}");
    }
}

#[derive(Serialize)]
struct UnitRow<'a> {
    id: &'a str,
    name: &'a str,
    category: &'a str,
    owned: bool,
    eza: u8,
    pot: u8,
}

fn list_units(
    tracker: &mut Tracker<FileStore>,
    options: ListOptions,
    format: OutputFormat,
) -> Result<()> {
    if let Some(search) = &options.search {
        tracker.set_search(search);
    }
    if let Some(category) = &options.category {
        if !tracker.catalog().categories().contains(category) {
            tracing::warn!("no units in category {category}");
        }
        tracker.set_category(category);
    }
    tracker.set_view_filter(options.view);

    let rows: Vec<UnitRow> = tracker
        .visible_items()
        .into_iter()
        .map(|item| {
            let record = tracker.record(&item.id);
            UnitRow {
                id: &item.id,
                name: &item.name,
                category: &item.category,
                owned: record.owned,
                eza: record.enhancement.value(),
                pot: record.potential.value(),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No units match.");
                return Ok(());
            }
            let name_width = name_column_width(&rows);
            for row in &rows {
                let owned = if row.owned { "[x]" } else { "[ ]" };
                let eza = match row.eza {
                    1 => "Z ",
                    2 => "Z★",
                    _ => "  ",
                };
                println!(
                    "{owned} {eza} {pot}/4  {name:<name_width$}  {category}  ({id})",
                    pot = row.pot,
                    name = row.name,
                    category = row.category,
                    id = row.id,
                );
            }
        }
    }
    Ok(())
}

fn name_column_width(rows: &[UnitRow]) -> usize {
    rows.iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or(4)
}

fn print_progress(progress: Progress, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        OutputFormat::Text => {
            println!("Owned {progress} ({:.0}%)", progress.percent());
        }
    }
    Ok(())
}

fn list_categories(tracker: &Tracker<FileStore>, format: OutputFormat) -> Result<()> {
    let categories = tracker.catalog().categories();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
        OutputFormat::Text => {
            for category in categories {
                println!("{category}");
            }
        }
    }
    Ok(())
}

fn activate_unit(
    tracker: &mut Tracker<FileStore>,
    id: &str,
    mode: Mode,
    format: OutputFormat,
) -> Result<()> {
    let Some(item) = tracker.catalog().get(id) else {
        bail!("Unknown unit id: {id}");
    };
    let name = item.name.clone();
    tracker.set_mode(mode);
    report_save(tracker.activate(id));
    let record = tracker.record(id);
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "id": id, "name": name, "record": record });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let owned = if record.owned { "owned" } else { "not owned" };
            println!(
                "{name}: {owned}, {}, potential {}/4",
                crate::app::enhancement_label(record.enhancement.value()),
                record.potential.value()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsOutput {
    data_dir: String,
    config_file: String,
    state_dir: String,
    log_file: String,
    default_catalog: String,
}

fn list_paths(paths: &AppPaths, global: &GlobalOptions) -> Result<()> {
    let output = PathsOutput {
        data_dir: paths.data_dir.display().to_string(),
        config_file: paths.config_file().display().to_string(),
        state_dir: paths.state_dir().display().to_string(),
        log_file: paths.log_file().display().to_string(),
        default_catalog: paths.default_catalog().display().to_string(),
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Data dir: {}", output.data_dir);
            println!("Config: {}", output.config_file);
            println!("State: {}", output.state_dir);
            println!("Log file: {}", output.log_file);
            println!("Default catalog: {}", output.default_catalog);
        }
    }
    Ok(())
}

fn print_help() {
    println!("dokkan-checklist v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  dokkan-checklist                      Launch the TUI");
    println!("  dokkan-checklist list [options]       List units with their status");
    println!("  dokkan-checklist progress             Show owned / total");
    println!("  dokkan-checklist categories           List catalog categories");
    println!("  dokkan-checklist activate <id>        Activate a unit (see --mode)");
    println!("  dokkan-checklist select-all           Mark every unit owned");
    println!("  dokkan-checklist select-none          Clear every owned flag");
    println!("  dokkan-checklist export               Print an export code");
    println!("  dokkan-checklist import <code|->      Replace state from an export code");
    println!("  dokkan-checklist paths                Show data, config and log paths");
    println!();
    println!("Global options:");
    println!("  --catalog <path|url>                  Unit catalog (overrides config)");
    println!("  --format <json|text>                  Output format");
    println!("  -v, --verbose                         Debug logging");
    println!("  -q, --quiet                           Errors only");
    println!("  -h, --help                            Show help");
    println!("  -V, --version                         Show version");
    println!();
    println!("List options:");
    println!("  --search <text>                       Name substring (case-insensitive)");
    println!("  --category <name>                     Exact category");
    println!("  --view <all|hide-owned|missing>       Ownership filter");
    println!();
    println!("Activate options:");
    println!("  --mode <owned|eza|pot>                Which field to change (default owned)");
}
