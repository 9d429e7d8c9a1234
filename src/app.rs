use crate::{
    catalog::{Catalog, CatalogSource, Item, ALL_CATEGORIES},
    config::{AppConfig, AppPaths},
    error::PersistenceWarning,
    filter::ViewFilter,
    mode::Mode,
    storage::FileStore,
    tracker::{SaveStatus, Tracker},
};
use anyhow::{Context, Result};
use arboard::Clipboard;
use std::time::{Duration, Instant};

const LOG_CAPACITY: usize = 200;
const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    Search { previous: String },
    ImportCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub catalog: Option<String>,
}

/// Config, catalog and saved state opened from the data dir. Shared by the
/// terminal UI and the one-shot CLI commands.
pub struct Session {
    pub config: AppConfig,
    pub source: CatalogSource,
    pub tracker: Tracker<FileStore>,
    pub warnings: Vec<PersistenceWarning>,
}

impl Session {
    /// A catalog failure is fatal; saved-state problems only produce warnings.
    pub fn open(paths: &AppPaths, catalog_override: Option<&str>) -> Result<Self> {
        let config = AppConfig::load_or_create(&paths.data_dir)?;
        let source = config.catalog_source(paths, catalog_override);
        let catalog =
            Catalog::load(&source).with_context(|| format!("load unit catalog from {source}"))?;
        let (tracker, warnings) = Tracker::open(catalog, FileStore::new(paths.state_dir()));
        Ok(Self {
            config,
            source,
            tracker,
            warnings,
        })
    }
}

pub struct App {
    pub tracker: Tracker<FileStore>,
    pub config: AppConfig,
    pub paths: AppPaths,
    pub catalog_label: String,
    pub status: String,
    pub selected: usize,
    pub input_mode: InputMode,
    pub help_open: bool,
    pub should_quit: bool,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub toast: Option<Toast>,
    clipboard: Option<Clipboard>,
}

impl App {
    pub fn initialize(paths: AppPaths, options: StartupOptions) -> Result<Self> {
        let Session {
            config,
            source,
            tracker,
            warnings,
        } = Session::open(&paths, options.catalog.as_deref())?;

        let mut app = Self {
            tracker,
            config,
            paths,
            catalog_label: source.to_string(),
            status: String::new(),
            selected: 0,
            input_mode: InputMode::Normal,
            help_open: false,
            should_quit: false,
            logs: Vec::new(),
            log_scroll: 0,
            toast: None,
            clipboard: None,
        };
        for warning in warnings {
            app.log_warn(format!("Saved state: {warning}"));
        }
        app.log_info(format!(
            "Loaded {} units from {}",
            app.tracker.catalog().len(),
            app.catalog_label
        ));
        app.status = format!("Progress {}", app.tracker.progress());
        Ok(app)
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        self.tracker.visible_items()
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.visible_items().get(self.selected).copied()
    }

    pub fn clamp_selection(&mut self) {
        let len = self.visible_items().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if delta.is_negative() {
            self.selected = self.selected.saturating_sub(delta.unsigned_abs());
        } else {
            self.selected = self.selected.saturating_add(delta.unsigned_abs());
        }
        self.clamp_selection();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible_items().len().saturating_sub(1);
    }

    pub fn activate_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let id = item.id.clone();
        let name = item.name.clone();
        let save = self.tracker.activate(&id);
        let record = self.tracker.record(&id);
        self.status = match self.tracker.view().mode {
            Mode::Owned => {
                if record.owned {
                    format!("{name}: owned")
                } else {
                    format!("{name}: not owned")
                }
            }
            Mode::Enhancement => {
                format!("{name}: {}", enhancement_label(record.enhancement.value()))
            }
            Mode::Potential => format!("{name}: potential {}/4", record.potential.value()),
        };
        self.report_save(save);
        self.clamp_selection();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.tracker.set_mode(mode);
        self.status = format!("Mode: {}", mode.label());
    }

    pub fn cycle_mode(&mut self) {
        let next = self.tracker.view().mode.next();
        self.set_mode(next);
    }

    pub fn set_view_filter(&mut self, filter: ViewFilter) {
        self.tracker.set_view_filter(filter);
        self.status = format!("View: {}", filter.label());
        self.clamp_selection();
    }

    pub fn cycle_view_filter(&mut self) {
        let next = self.tracker.view().view_filter.next();
        self.set_view_filter(next);
    }

    /// Steps through "All Categories" followed by the sorted categories.
    pub fn cycle_category(&mut self, delta: isize) {
        let mut options = vec![ALL_CATEGORIES.to_string()];
        options.extend(self.tracker.catalog().categories());
        let current = self.tracker.view().category_label().to_string();
        let index = options
            .iter()
            .position(|option| *option == current)
            .unwrap_or(0);
        let len = options.len() as isize;
        let next = (index as isize + delta).rem_euclid(len) as usize;
        self.tracker.set_category(&options[next]);
        self.status = format!("Category: {}", options[next]);
        self.select_first();
    }

    pub fn select_all(&mut self) {
        let save = self.tracker.select_all();
        self.status = format!("Marked all owned ({})", self.tracker.progress());
        self.log_info("Selected all units".to_string());
        self.report_save(save);
        self.clamp_selection();
    }

    pub fn select_none(&mut self) {
        let save = self.tracker.select_none();
        self.status = format!("Cleared owned ({})", self.tracker.progress());
        self.log_info("Cleared all owned flags".to_string());
        self.report_save(save);
        self.clamp_selection();
    }

    pub fn export(&mut self) {
        let token = match self.tracker.export_state() {
            Ok(token) => token,
            Err(err) => {
                self.set_toast("Export failed.", ToastLevel::Error);
                self.status = "Export failed".to_string();
                self.log_error(format!("Export failed: {err}"));
                return;
            }
        };
        self.log_info(format!("Export code: {token}"));
        if self.config.copy_export_to_clipboard && self.copy_to_clipboard(&token) {
            self.set_toast("Export copied to clipboard.", ToastLevel::Info);
            self.status = "Export copied to clipboard".to_string();
        } else {
            self.set_toast("Export code written to the log.", ToastLevel::Warn);
            self.status = "Export code written to the log".to_string();
        }
    }

    pub fn import_code(&mut self, token: &str) {
        match self.tracker.import_state(token) {
            Ok(save) => {
                self.set_toast("Imported.", ToastLevel::Info);
                self.status = format!("Imported ({})", self.tracker.progress());
                self.log_info("Import applied".to_string());
                self.report_save(save);
                self.clamp_selection();
            }
            Err(err) => {
                self.set_toast("Invalid import code.", ToastLevel::Error);
                self.status = "Import rejected".to_string();
                self.log_error(format!("Import rejected: {}", err.reason()));
            }
        }
    }

    pub fn enter_search(&mut self) {
        let current = self.tracker.view().search_text.clone();
        self.input_mode = InputMode::Editing {
            prompt: "Search".to_string(),
            buffer: current.clone(),
            purpose: InputPurpose::Search { previous: current },
        };
    }

    pub fn enter_import(&mut self, initial: String) {
        self.input_mode = InputMode::Editing {
            prompt: "Import code".to_string(),
            buffer: initial,
            purpose: InputPurpose::ImportCode,
        };
    }

    /// Live update while the search prompt is open.
    pub fn preview_search(&mut self, text: &str) {
        self.tracker.set_search(text);
        self.select_first();
    }

    pub fn cancel_input(&mut self, purpose: InputPurpose) {
        match purpose {
            InputPurpose::Search { previous } => {
                self.tracker.set_search(&previous);
                self.clamp_selection();
                self.set_toast("Search cancelled", ToastLevel::Warn);
            }
            InputPurpose::ImportCode => self.set_toast("Import cancelled", ToastLevel::Warn),
        }
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) {
        match purpose {
            InputPurpose::Search { .. } => {
                self.tracker.set_search(value.trim());
                self.status = if value.trim().is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("Search: {}", value.trim())
                };
                self.select_first();
            }
            InputPurpose::ImportCode => {
                if value.trim().is_empty() {
                    self.set_toast("Import cancelled", ToastLevel::Warn);
                    return;
                }
                self.import_code(&value);
            }
        }
    }

    pub fn hint(&self) -> &'static str {
        "Space activate | Tab mode | / search | c category | f view | e export | i import | ? help"
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    fn report_save(&mut self, save: SaveStatus) {
        if let Some(warning) = save.warning() {
            self.set_toast("Progress not saved", ToastLevel::Warn);
            self.log_warn(format!("Save failed: {warning}"));
        }
    }

    pub(crate) fn copy_to_clipboard(&mut self, text: &str) -> bool {
        let result = match self.clipboard_mut() {
            Some(clipboard) => clipboard.set_text(text.to_string()),
            None => return false,
        };
        if let Err(err) = result {
            self.status = format!("Clipboard copy failed: {err}");
            self.log_warn(format!("Clipboard copy failed: {err}"));
            return false;
        }
        true
    }

    fn clipboard_mut(&mut self) -> Option<&mut Clipboard> {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => {
                    self.clipboard = Some(clipboard);
                }
                Err(err) => {
                    self.status = format!("Clipboard unavailable: {err}");
                    self.log_warn(format!("Clipboard unavailable: {err}"));
                    return None;
                }
            }
        }
        self.clipboard.as_mut()
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = self
            .log_scroll
            .saturating_add(lines)
            .min(self.logs.len().saturating_sub(1));
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }

        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }
        self.logs.push(LogEntry { level, message });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }
    }
}

pub fn enhancement_label(tier: u8) -> &'static str {
    match tier {
        1 => "EZA",
        2 => "Super EZA",
        _ => "no EZA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const UNITS: &str = r#"[
        {"id": "1", "name": "Goku", "category": "STR"},
        {"id": "2", "name": "Vegeta", "category": "AGL"},
        {"id": "3", "name": "Gohan", "category": "STR"}
    ]"#;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let paths = AppPaths {
            data_dir: dir.path().to_path_buf(),
        };
        fs::write(paths.default_catalog(), UNITS).unwrap();
        let config = AppConfig {
            copy_export_to_clipboard: false,
            ..AppConfig::default()
        };
        config.save(&paths.data_dir).unwrap();
        App::initialize(paths, StartupOptions::default()).unwrap()
    }

    #[test]
    fn initialize_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        assert_eq!(app.visible_items().len(), 3);
        assert_eq!(app.status, "Progress 0 / 3");
        assert!(app.paths.state_dir().join("dokkan_checklist_v1.json").exists());
    }

    #[test]
    fn missing_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths {
            data_dir: dir.path().to_path_buf(),
        };
        assert!(App::initialize(paths, StartupOptions::default()).is_err());
    }

    #[test]
    fn activation_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.move_selection(1);
        app.activate_selected();
        assert_eq!(app.status, "Vegeta: owned");
        app.set_mode(Mode::Enhancement);
        app.activate_selected();
        app.activate_selected();
        assert_eq!(app.status, "Vegeta: Super EZA");
        drop(app);

        let app = test_app(&dir);
        let record = app.tracker.record("2");
        assert!(record.owned);
        assert_eq!(record.enhancement.value(), 2);
    }

    #[test]
    fn hide_owned_clamps_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.set_view_filter(ViewFilter::HideOwned);
        app.select_last();
        app.activate_selected();
        assert_eq!(app.visible_items().len(), 2);
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn category_cycle_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.cycle_category(1);
        assert_eq!(app.tracker.view().category_label(), "AGL");
        app.cycle_category(1);
        assert_eq!(app.tracker.view().category_label(), "STR");
        assert_eq!(app.visible_items().len(), 2);
        app.cycle_category(1);
        assert_eq!(app.tracker.view().category_label(), ALL_CATEGORIES);
        app.cycle_category(-1);
        assert_eq!(app.tracker.view().category_label(), "STR");
    }

    #[test]
    fn cancelled_search_restores_previous_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.handle_submit(
            InputPurpose::Search {
                previous: String::new(),
            },
            " goh ".to_string(),
        );
        assert_eq!(app.tracker.view().search_text, "goh");
        assert_eq!(app.visible_items().len(), 1);

        app.enter_search();
        app.preview_search("v");
        assert_eq!(app.visible_items().len(), 1);
        let InputMode::Editing { purpose, .. } = app.input_mode.clone() else {
            panic!("expected editing mode");
        };
        app.cancel_input(purpose);
        assert_eq!(app.tracker.view().search_text, "goh");
    }

    #[test]
    fn export_without_clipboard_goes_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.select_all();
        app.export();
        assert_eq!(app.status, "Export code written to the log");
        let token = app
            .logs
            .iter()
            .find_map(|entry| entry.message.strip_prefix("Export code: "))
            .unwrap()
            .to_string();

        app.select_none();
        app.import_code(&token);
        assert_eq!(app.tracker.progress().owned, 3);
        assert_eq!(app.toast.as_ref().map(|t| t.level), Some(ToastLevel::Info));
    }

    #[test]
    fn invalid_import_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.activate_selected();
        app.import_code("not a code");
        assert_eq!(app.status, "Import rejected");
        assert_eq!(app.toast.as_ref().map(|t| t.level), Some(ToastLevel::Error));
        assert!(app.tracker.record("1").owned);
        assert_eq!(app.logs.last().map(|entry| entry.level), Some(LogLevel::Error));
    }

    #[test]
    fn log_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        for index in 0..(LOG_CAPACITY + 25) {
            app.log_info(format!("line {index}"));
        }
        assert_eq!(app.logs.len(), LOG_CAPACITY);
        assert_eq!(
            app.logs.last().map(|entry| entry.message.as_str()),
            Some("line 224")
        );
    }
}
