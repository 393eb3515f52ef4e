use anyhow::Result;
use std::path::PathBuf;

use crate::api::GeminiClient;
use crate::config::Config;
use crate::core::session::{next_free_counter, BatchRequest};
use crate::core::{ImageAsset, Session, StudioError};

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Main view with inputs and results
    Main,
    /// Typing into one of the text fields
    Input(InputField),
    /// Settings screen
    Settings,
}

/// Text field being typed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    BasePath,
    ReferencePath,
    Prefix,
}

impl InputField {
    pub fn title(&self) -> &'static str {
        match self {
            InputField::BasePath => "Base image path (Enter to load, Esc to cancel)",
            InputField::ReferencePath => "Reference image path (Enter to load, Esc to cancel)",
            InputField::Prefix => "File prefix (Enter to apply, Esc to cancel)",
        }
    }
}

/// Settings field being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Model,
    BaseUrl,
    Timeout,
    OutputDirectory,
    DefaultPrefix,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[
            SettingsField::Model,
            SettingsField::BaseUrl,
            SettingsField::Timeout,
            SettingsField::OutputDirectory,
            SettingsField::DefaultPrefix,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::Model => "Model",
            SettingsField::BaseUrl => "API Base URL",
            SettingsField::Timeout => "Timeout (secs)",
            SettingsField::OutputDirectory => "Output Directory",
            SettingsField::DefaultPrefix => "Default Prefix",
        }
    }

    pub fn config_key(&self) -> &'static str {
        match self {
            SettingsField::Model => "api.model",
            SettingsField::BaseUrl => "api.base_url",
            SettingsField::Timeout => "api.timeout_secs",
            SettingsField::OutputDirectory => "output.directory",
            SettingsField::DefaultPrefix => "output.prefix",
        }
    }
}

/// Result of a batch that ran on a background task
#[derive(Debug)]
pub struct BatchCompletion {
    pub ticket: u64,
    pub outcome: Result<Vec<String>, StudioError>,
}

/// TUI application state
pub struct App {
    /// Current mode
    pub mode: AppMode,

    /// Configuration
    pub config: Config,

    /// Images, results and flags of this session
    pub session: Session,

    /// Selected result index
    pub selected: usize,

    /// Text input buffer
    pub input: String,

    /// Cursor position in input (in chars)
    pub cursor_pos: usize,

    /// Status message
    pub status_message: Option<String>,

    /// Errors outside the session (e.g. failed downloads)
    pub error_message: Option<String>,

    /// Whether to quit
    pub should_quit: bool,

    /// Whether config was changed
    pub config_changed: bool,

    /// Settings: selected field index
    pub settings_selected: usize,

    /// Settings: currently editing
    pub settings_editing: bool,

    /// Settings: edit buffer
    pub settings_edit_buffer: String,

    completions_tx: async_channel::Sender<BatchCompletion>,
    completions_rx: async_channel::Receiver<BatchCompletion>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let mut session = Session::new(config.output.prefix.clone());
        let dir = PathBuf::from(&config.output.directory);
        session.resume_counter(next_free_counter(&dir, session.prefix()));

        let (completions_tx, completions_rx) = async_channel::unbounded();

        Self {
            mode: AppMode::Main,
            config,
            session,
            selected: 0,
            input: String::new(),
            cursor_pos: 0,
            status_message: None,
            error_message: None,
            should_quit: false,
            config_changed: false,
            settings_selected: 0,
            settings_editing: false,
            settings_edit_buffer: String::new(),
            completions_tx,
            completions_rx,
        }
    }

    /// Set status message
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.error_message = None;
    }

    /// Set error message
    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error_message = Some(msg.into());
        self.status_message = None;
    }

    /// Clear messages
    pub fn clear_messages(&mut self) {
        self.status_message = None;
        self.error_message = None;
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.output.directory)
    }

    /// Move selection up
    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Move selection down
    pub fn select_next(&mut self) {
        if self.selected < self.session.results().len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    /// Enter text input for a field, pre-filled with its current value
    pub fn start_input(&mut self, field: InputField) {
        self.input = match field {
            InputField::BasePath => match self.session.base_image().map(|b| &b.asset) {
                Some(ImageAsset::File { path, .. }) => path.display().to_string(),
                _ => String::new(),
            },
            InputField::ReferencePath => match self.session.reference_image() {
                Some(ImageAsset::File { path, .. }) => path.display().to_string(),
                _ => String::new(),
            },
            InputField::Prefix => self.session.prefix().to_string(),
        };
        self.cursor_pos = self.input.chars().count();
        self.mode = AppMode::Input(field);
        self.clear_messages();
    }

    /// Apply a submitted text field
    pub fn submit_input(&mut self, field: InputField, value: &str) {
        let value = value.trim();
        match field {
            InputField::BasePath | InputField::ReferencePath => {
                let path = PathBuf::from(value);
                if !path.is_file() {
                    self.set_error(format!("Image not found: {}", value));
                    return;
                }
                let asset = ImageAsset::from_path(path);
                let label = asset.label();
                if field == InputField::BasePath {
                    self.session.set_base_image(asset);
                    self.set_status(format!("Base image: {}", label));
                } else {
                    self.session.set_reference_image(asset);
                    self.set_status(format!("Reference image: {}", label));
                }
            }
            InputField::Prefix => {
                if value.is_empty() || value.contains(['/', '\\']) {
                    self.set_error("Prefix must be non-empty and contain no path separators");
                    return;
                }
                self.session.set_prefix(value);
                self.set_status(format!("Next download: {}", self.session.next_filename()));
            }
        }
    }

    /// Start a fresh batch from the selected images
    pub fn generate(&mut self) {
        self.clear_messages();
        match self.session.begin_generate() {
            Ok(request) => {
                self.selected = 0;
                self.spawn_batch(request);
            }
            Err(e) => {
                tracing::debug!("Generate rejected: {}", e);
                if self.session.error().is_none() {
                    self.set_error(e.to_string());
                }
            }
        }
    }

    /// Start re-variating the selected result
    pub fn revariate_selected(&mut self) {
        self.clear_messages();
        match self.session.begin_revariate(self.selected) {
            Ok(request) => self.spawn_batch(request),
            Err(e) => {
                tracing::debug!("Re-variation rejected: {}", e);
                if self.session.error().is_none() {
                    self.set_error(e.to_string());
                }
            }
        }
    }

    /// Save the selected result to the output directory
    pub async fn download_selected(&mut self) {
        let dir = self.output_dir();
        match self.session.download(self.selected, &dir).await {
            Ok(path) => self.set_status(format!("Saved {}", path.display())),
            Err(e) => self.set_error(format!("Download failed: {}", e)),
        }
    }

    /// Run the batch on a background task; the result arrives via the channel
    fn spawn_batch(&mut self, request: BatchRequest) {
        // Credentials are read at call time so config edits apply immediately
        let client = match GeminiClient::from_config(&self.config) {
            Ok(client) => client,
            Err(e) => {
                self.session.complete(request.ticket, Err(e));
                return;
            }
        };

        tracing::info!("Starting {} batch (ticket {})", request.kind.as_str(), request.ticket);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = request.run(&client).await;
            let completion = BatchCompletion {
                ticket: request.ticket,
                outcome,
            };
            if tx.send(completion).await.is_err() {
                tracing::debug!("Batch finished after the UI closed");
            }
        });
    }

    /// Apply any batches that finished since the last frame
    pub fn poll_completions(&mut self) {
        while let Ok(done) = self.completions_rx.try_recv() {
            if self.session.complete(done.ticket, done.outcome) && self.session.error().is_none() {
                self.selected = 0;
                self.set_status(format!(
                    "{} variations ready",
                    self.session.results().len()
                ));
            }
        }
    }

    /// Get current settings value
    pub fn get_settings_value(&self, field: &SettingsField) -> String {
        self.config.get(field.config_key()).unwrap_or_default()
    }

    /// Set settings value
    pub fn set_settings_value(&mut self, field: &SettingsField, value: &str) -> Result<()> {
        self.config.set(field.config_key(), value)?;
        self.config_changed = true;
        Ok(())
    }

    /// Get options for a settings field (if applicable)
    pub fn get_settings_options(&self, field: &SettingsField) -> Option<Vec<&'static str>> {
        match field {
            SettingsField::Model => Some(Config::models().to_vec()),
            _ => None,
        }
    }

    /// Cycle to next option for a settings field
    pub fn cycle_settings_option(&mut self, field: &SettingsField) -> Result<()> {
        if let Some(options) = self.get_settings_options(field) {
            let current = self.get_settings_value(field);
            let current_idx = options.iter().position(|&o| o == current).unwrap_or(0);
            let next_idx = (current_idx + 1) % options.len();
            self.set_settings_value(field, options[next_idx])?;
        }
        Ok(())
    }
}
