//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Synchronous assessment on submit

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

use crate::adapters::GradientBoostedClassifier;
use crate::application::AssessmentService;
use crate::config::AppConfig;
use crate::ports::RiskClassifier;

use super::ui::{
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result, ResultState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    PatientForm,
    Result,
}

/// Main application state
pub struct App<C: RiskClassifier = GradientBoostedClassifier> {
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    /// Assessment service
    assessment_service: AssessmentService<C>,

    /// Patient form state
    patient_form_state: PatientFormState,

    /// Result state
    result_state: ResultState,
}

impl App<GradientBoostedClassifier> {
    /// Create a new application, loading and verifying the model.
    ///
    /// For more control, use `with_dependencies()`.
    ///
    /// # Errors
    /// Returns error if the model cannot be loaded or verified.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let model_path = &config.model_path;
        if !model_path.exists() {
            return Err(anyhow!(
                "Model path not found at {:?}. Set NEPHRO_MODEL_PATH to a directory containing ckd_model.json.",
                model_path
            ));
        }

        let trust = config.model_trust()?;
        let classifier = GradientBoostedClassifier::load(model_path, &trust)
            .map_err(|e| anyhow!("Failed to load model from {:?}: {}", model_path, e))?;

        Ok(Self::with_dependencies(AssessmentService::new(Arc::new(
            classifier,
        ))))
    }
}

impl<C: RiskClassifier> App<C> {
    /// Create application with an injected assessment service.
    pub fn with_dependencies(assessment_service: AssessmentService<C>) -> Self {
        Self {
            screen: Screen::PatientForm,
            should_quit: false,
            assessment_service,
            patient_form_state: PatientFormState::default(),
            result_state: ResultState::default(),
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
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

        // Restore terminal
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
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::PatientForm => {
                        render_patient_form(f, chunks[0], &self.patient_form_state)
                    }
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
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
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.patient_form_state.prev_field();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.patient_form_state.next_field();
            }
            KeyCode::Left => {
                self.patient_form_state.cycle_choice(false);
            }
            KeyCode::Right => {
                self.patient_form_state.cycle_choice(true);
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.patient_form_state.load_sample_data();
            }
            KeyCode::Char(c) => {
                self.patient_form_state.input_char(c);
            }
            KeyCode::Backspace => {
                self.patient_form_state.delete_char();
            }
            KeyCode::Delete => {
                self.patient_form_state.clear_field();
            }
            KeyCode::Enter => {
                self.submit_patient_form();
            }
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                self.screen = Screen::PatientForm;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.patient_form_state = PatientFormState::default();
                self.result_state = ResultState::Idle;
                self.screen = Screen::PatientForm;
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn submit_patient_form(&mut self) {
        let raw = match self.patient_form_state.to_raw_input() {
            Ok(raw) => raw,
            Err(errors) => {
                tracing::debug!("Form rejected ({} violation(s))", errors.len());
                self.patient_form_state.errors = errors;
                return;
            }
        };

        self.result_state = match self.assessment_service.assess(&raw) {
            Ok(assessment) => ResultState::Complete { assessment },
            Err(e) => {
                tracing::error!("Assessment failed: {}", e);
                ResultState::Error {
                    message: e.to_string(),
                }
            }
        };
        self.screen = Screen::Result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatientRecord, RiskLevel, FEATURE_NAMES};
    use crate::ports::ClassifierError;

    struct ThresholdClassifier {
        names: Vec<String>,
    }

    impl RiskClassifier for ThresholdClassifier {
        fn predict(&self, record: &PatientRecord) -> std::result::Result<i64, ClassifierError> {
            Ok(match record.serum_creatinine {
                c if c >= 4.0 => 9,
                c if c >= 2.0 => 2,
                _ => 0,
            })
        }

        fn feature_names(&self) -> &[String] {
            &self.names
        }
    }

    fn test_app() -> App<ThresholdClassifier> {
        let classifier = ThresholdClassifier {
            names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
        };
        App::with_dependencies(AssessmentService::new(Arc::new(classifier)))
    }

    fn type_into(app: &mut App<ThresholdClassifier>, field: usize, text: &str) {
        app.patient_form_state.selected_field = field;
        app.handle_key(KeyCode::Delete, KeyModifiers::NONE);
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn test_submit_shows_result_and_enter_keeps_values() {
        let mut app = test_app();
        type_into(&mut app, 4, "2.5");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.screen(), Screen::Result);
        match &app.result_state {
            ResultState::Complete { assessment } => {
                assert_eq!(assessment.risk_level, RiskLevel::High);
            }
            other => panic!("unexpected state: {other:?}"),
        }

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen(), Screen::PatientForm);
        assert_eq!(app.patient_form_state.fields[4].value, "2.5");
    }

    #[test]
    fn test_new_assessment_resets_form() {
        let mut app = test_app();
        app.handle_key(KeyCode::Char('S'), KeyModifiers::NONE);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen(), Screen::Result);

        app.handle_key(KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(app.screen(), Screen::PatientForm);
        assert_eq!(app.patient_form_state.fields[1].value, "120");
    }

    #[test]
    fn test_invalid_form_stays_on_form() {
        let mut app = test_app();
        type_into(&mut app, 1, "250");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen(), Screen::PatientForm);
        assert_eq!(app.patient_form_state.errors.len(), 1);
    }

    #[test]
    fn test_unrecognized_code_shows_error_panel() {
        let mut app = test_app();
        type_into(&mut app, 4, "4.5");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(matches!(app.result_state, ResultState::Error { .. }));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit());

        let mut app = test_app();
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.should_quit());
    }

    #[test]
    fn test_arrows_cycle_choice_fields() {
        let mut app = test_app();
        app.patient_form_state.selected_field = 7;
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(
            app.patient_form_state.fields[7].selected_label(),
            Some("Diagnosed")
        );
    }
}
