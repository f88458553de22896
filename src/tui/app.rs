//! Main TUI application state.
//!
//! Handles:
//! - Form input events
//! - Submitting the form to the prediction service
//! - Mapping failures to the message shown in the result panel

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::artifacts::load_bundle;
use crate::adapters::forest::RandomForestModel;
use crate::application::PredictionService;
use crate::config::AppConfig;
use crate::ports::Classifier;
use crate::FailureKind;

use super::ui::{
    form::{render_form, FormState},
    render_disclaimer, render_header,
    result::{render_result, ResultState},
};

/// Main application state
pub struct App<C = RandomForestModel>
where
    C: Classifier,
{
    /// Whether the app should quit
    should_quit: bool,

    service: PredictionService<C>,

    form_state: FormState,

    result_state: ResultState,
}

impl App<RandomForestModel> {
    /// Create a new application from the artifacts named in `config`.
    ///
    /// # Errors
    /// Returns error if the model directory is missing, an artifact fails to
    /// load or verify, or the model does not fit the encoded record.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let model_dir = config.model_dir.as_path();
        if !model_dir.exists() {
            return Err(anyhow!(
                "Model path not found at {:?}. Set XTALCLASS_MODEL_PATH to a directory containing label_encoders.json and model.json.",
                model_dir
            ));
        }

        // Refuse to start on artifacts that cannot be loaded or verified.
        let bundle = load_bundle(model_dir, config.require_manifest)
            .map_err(|e| anyhow!("Failed to load artifacts from {:?}: {}", model_dir, e))?;

        let service = PredictionService::new(Arc::new(bundle.model), Arc::new(bundle.encoders))?;
        Ok(Self::with_dependencies(service))
    }
}

impl<C> App<C>
where
    C: Classifier,
{
    /// Create application with an injected prediction service.
    #[must_use]
    pub fn with_dependencies(service: PredictionService<C>) -> Self {
        Self {
            should_quit: false,
            service,
            form_state: FormState::default(),
            result_state: ResultState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3), // Header
                        Constraint::Min(0),    // Form
                        Constraint::Length(4), // Result
                        Constraint::Length(2), // Disclaimer
                    ])
                    .split(f.area());

                render_header(f, chunks[0]);
                render_form(f, chunks[1], &self.form_state);
                render_result(f, chunks[2], &self.result_state);
                render_disclaimer(f, chunks[3]);
            })?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    // Windows reports releases too
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('l') => self.form_state.load_sample_data(),
                KeyCode::Char('r') => {
                    self.form_state.reset();
                    self.result_state = ResultState::Idle;
                }
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Left => self.form_state.adjust(-1),
            KeyCode::Right => self.form_state.adjust(1),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Char(c) => self.form_state.input_char(c),
            _ => {}
        }
    }

    /// Convert the form and run one prediction.
    ///
    /// Form values stay in place so the user can tweak and resubmit.
    fn submit(&mut self) {
        let sample = match self.form_state.to_raw_sample() {
            Ok(sample) => sample,
            Err(e) => {
                self.form_state.error_message = Some(e);
                return;
            }
        };

        if let Err(errors) = sample.validate() {
            self.form_state.error_message = Some(errors.join(", "));
            return;
        }
        self.form_state.error_message = None;

        self.result_state = match self.service.predict(&sample) {
            Ok(prediction) => ResultState::Predicted(prediction),
            Err(e) => match e.kind() {
                FailureKind::UnrecognizedCategory => {
                    tracing::warn!("Encoding failed: {}", e);
                    ResultState::EncodingFailed(e.to_string())
                }
                FailureKind::Unspecified => {
                    tracing::error!("Prediction failed: {}", e);
                    ResultState::Failed(e.to_string())
                }
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::tests::write_artifacts;
    use crate::adapters::forest::tests::demo_forest;
    use crate::domain::encoding::tests::fitted_table;
    use crate::domain::{ClassLabel, EncodingTable, EnzymeClass, LabelEncoder, PredictionSource};
    use tempfile::tempdir;

    fn demo_app() -> App {
        let model = RandomForestModel::from_export(demo_forest()).expect("valid forest");
        let service = PredictionService::new(Arc::new(model), Arc::new(fitted_table()))
            .expect("Should build service");
        App::with_dependencies(service)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyCode::Char(c), KeyModifiers::CONTROL);
    }

    fn focus(app: &mut App, label: &str) {
        while app.form_state.fields[app.form_state.selected_field].label != label {
            press(app, KeyCode::Down);
        }
    }

    fn type_into(app: &mut App, label: &str, text: &str) {
        focus(app, label);
        press(app, KeyCode::Delete);
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_sample_data_predicts_hydrolase() {
        let mut app = demo_app();
        ctrl(&mut app, 'l');
        press(&mut app, KeyCode::Enter);

        match &app.result_state {
            ResultState::Predicted(prediction) => {
                assert_eq!(prediction.label, ClassLabel::Known(EnzymeClass::Hydrolase));
                assert_eq!(prediction.source, PredictionSource::Model);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_residue_count_200_uses_override() {
        let mut app = demo_app();
        type_into(&mut app, "Residue Count", "200");
        press(&mut app, KeyCode::Enter);

        match &app.result_state {
            ResultState::Predicted(prediction) => {
                assert_eq!(prediction.label.to_string(), "TRANSFERASE");
                assert_eq!(prediction.source, PredictionSource::ResidueOverride);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_high_ph_and_long_chain_changes_class() {
        let mut app = demo_app();
        type_into(&mut app, "pH", "9.0");
        type_into(&mut app, "Residue Count", "450");
        press(&mut app, KeyCode::Enter);

        match &app.result_state {
            ResultState::Predicted(prediction) => {
                // (0.1 + 0.1) / 2 vs (0.1 + 0.6) / 2 vs (0.8 + 0.3) / 2
                assert_eq!(prediction.label.to_string(), "OXIDOREDUCTASE");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_chain_reports_encoding_error() {
        // Encoders fitted without chain H
        let full = fitted_table();
        let mut table = EncodingTable::new();
        for column in full.fields() {
            let encoder = full.get(column).expect("present").clone();
            let encoder = if column == "chainId" {
                LabelEncoder::from_classes(
                    encoder
                        .classes()
                        .iter()
                        .filter(|c| *c != "H")
                        .cloned()
                        .collect(),
                )
                .expect("valid encoder")
            } else {
                encoder
            };
            table.insert(column, encoder);
        }
        let model = RandomForestModel::from_export(demo_forest()).expect("valid forest");
        let service =
            PredictionService::new(Arc::new(model), Arc::new(table)).expect("Should build service");
        let mut app = App::with_dependencies(service);

        focus(&mut app, "Chain ID");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Enter);

        let message = app.result_state.message().expect("Should fail");
        assert!(message.starts_with("Error while encoding input:"));
        assert!(message.contains("chainId"));
    }

    #[test]
    fn test_invalid_form_value_keeps_previous_result() {
        let mut app = demo_app();
        type_into(&mut app, "pH", "15");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.result_state, ResultState::Idle));
        let err = app.form_state.error_message.as_deref().expect("form error");
        assert!(err.starts_with("pH"));
    }

    #[test]
    fn test_reset_and_quit_keys() {
        let mut app = demo_app();
        ctrl(&mut app, 'l');
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.result_state, ResultState::Predicted(_)));

        ctrl(&mut app, 'r');
        assert!(matches!(app.result_state, ResultState::Idle));
        assert_eq!(
            app.form_state.to_raw_sample().expect("defaults"),
            crate::RawSample::default()
        );

        assert!(!app.should_quit);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_new_loads_artifacts_from_config() {
        let dir = tempdir().expect("tempdir");
        write_artifacts(dir.path());

        let config = AppConfig {
            model_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let mut app = App::new(&config).expect("Should load");
        ctrl(&mut app, 'l');
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.result_state, ResultState::Predicted(_)));
    }

    #[test]
    fn test_new_rejects_missing_directory() {
        let dir = tempdir().expect("tempdir");
        let config = AppConfig {
            model_dir: dir.path().join("absent"),
            ..AppConfig::default()
        };
        assert!(App::new(&config).is_err());
    }
}
