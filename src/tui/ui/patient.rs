//! Patient data input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::bounds::{
    AGE_RANGE, CREATININE_COLLECTED, DIASTOLIC_COLLECTED, SCORE_COLLECTED, SYSTOLIC_COLLECTED,
    UREA_COLLECTED,
};
use crate::domain::categorical::{ALBUMIN_LEVEL, MEDICAL_HISTORY, NEPHROTOXIC_DRUG};
use crate::domain::{CategoryTable, RawPatientInput};
use crate::tui::styles::MedicalTheme;

/// How a field is edited.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Typed whole number
    Integer,
    /// Typed decimal number
    Decimal,
    /// Cycled through a fixed label table
    Choice(&'static CategoryTable),
}

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub hint: String,
    pub kind: FieldKind,
    /// Text buffer for numeric fields
    pub value: String,
    /// Selected position for choice fields
    pub choice: usize,
}

impl FormField {
    fn integer(label: &'static str, unit: &str, range: (u32, u32)) -> Self {
        Self {
            label,
            hint: format!("{unit} ({}-{})", range.0, range.1)
                .trim_start()
                .to_string(),
            kind: FieldKind::Integer,
            value: String::new(),
            choice: 0,
        }
    }

    fn decimal(label: &'static str, unit: &str, range: (f64, f64)) -> Self {
        Self {
            label,
            hint: format!("{unit} ({:.1}-{:.1})", range.0, range.1)
                .trim_start()
                .to_string(),
            kind: FieldKind::Decimal,
            value: String::new(),
            choice: 0,
        }
    }

    fn choice(label: &'static str, table: &'static CategoryTable) -> Self {
        Self {
            label,
            hint: "←/→ to change".to_string(),
            kind: FieldKind::Choice(table),
            value: String::new(),
            choice: 0,
        }
    }

    /// The label currently selected, for choice fields.
    #[must_use]
    pub fn selected_label(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::Choice(table) => table.entries.get(self.choice).map(|(label, _)| *label),
            _ => None,
        }
    }

    fn set_label(&mut self, label: &str) {
        if let FieldKind::Choice(table) = self.kind {
            self.choice = table.position(label).unwrap_or(0);
        }
    }
}

// Field positions, in RawPatientInput order.
const AGE: usize = 0;
const SYSTOLIC: usize = 1;
const DIASTOLIC: usize = 2;
const UREA: usize = 3;
const CREATININE: usize = 4;
const ALBUMIN: usize = 5;
const DIABETES: usize = 6;
const HYPERTENSION: usize = 7;
const NEPHROTOXIC: usize = 8;
const TOXICITY: usize = 9;
const PK_INTERACTION: usize = 10;

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub errors: Vec<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        let mut state = Self {
            fields: vec![
                FormField::integer("Age", "years", AGE_RANGE),
                FormField::decimal("Systolic BP", "mmHg", SYSTOLIC_COLLECTED),
                FormField::decimal("Diastolic BP", "mmHg", DIASTOLIC_COLLECTED),
                FormField::decimal("Blood Urea", "", UREA_COLLECTED),
                FormField::decimal("Serum Creatinine", "", CREATININE_COLLECTED),
                FormField::choice("Albumin", &ALBUMIN_LEVEL),
                FormField::choice("Diabetes", &MEDICAL_HISTORY),
                FormField::choice("Hypertension", &MEDICAL_HISTORY),
                FormField::choice("Nephrotoxic Drugs", &NEPHROTOXIC_DRUG),
                FormField::decimal("Toxicity Score", "composite", SCORE_COLLECTED),
                FormField::decimal("PK Interaction Score", "", SCORE_COLLECTED),
            ],
            selected_field: 0,
            errors: Vec::new(),
        };
        state.fill(&RawPatientInput::default());
        state
    }
}

impl Drop for PatientFormState {
    fn drop(&mut self) {
        self.clear_sensitive();
    }
}

impl PatientFormState {
    /// Populate every field from `input`.
    pub fn fill(&mut self, input: &RawPatientInput) {
        let numeric = [
            (AGE, input.patient_age.to_string()),
            (SYSTOLIC, input.bp_systolic.to_string()),
            (DIASTOLIC, input.bp_diastolic.to_string()),
            (UREA, input.blood_urea.to_string()),
            (CREATININE, input.serum_creatinine.to_string()),
            (TOXICITY, input.toxicity_score_composite.to_string()),
            (PK_INTERACTION, input.pk_toxic_interaction_score.to_string()),
        ];
        for (idx, text) in numeric {
            self.fields[idx].value.zeroize();
            self.fields[idx].value = text;
        }

        self.fields[ALBUMIN].set_label(&input.albumin);
        self.fields[DIABETES].set_label(&input.diabetes);
        self.fields[HYPERTENSION].set_label(&input.hypertension);
        self.fields[NEPHROTOXIC].set_label(&input.nephrotoxic);
        self.errors.clear();
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Cycle a choice field forward (or backward).
    pub fn cycle_choice(&mut self, forward: bool) {
        let field = &mut self.fields[self.selected_field];
        if let FieldKind::Choice(table) = field.kind {
            let n = table.len();
            field.choice = if forward {
                (field.choice + 1) % n
            } else {
                (field.choice + n - 1) % n
            };
            self.errors.clear();
        }
    }

    /// Add a character to the current field
    pub fn input_char(&mut self, c: char) {
        let field = &mut self.fields[self.selected_field];
        let accepted = match field.kind {
            FieldKind::Integer => c.is_ascii_digit(),
            FieldKind::Decimal => c.is_ascii_digit() || (c == '.' && !field.value.contains('.')),
            FieldKind::Choice(_) => false,
        };
        if accepted {
            field.value.push(c);
            self.errors.clear();
        }
    }

    /// Delete the last character
    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].value.pop();
    }

    /// Clear the current field
    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.zeroize();
    }

    /// Wipe all numeric buffers.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
        }
        self.errors.clear();
    }

    /// Parse the form into raw input and check collection bounds.
    ///
    /// # Errors
    /// Returns every parse and range violation found.
    pub fn to_raw_input(&self) -> Result<RawPatientInput, Vec<String>> {
        // Unparsable fields fall back to their in-range default so the range
        // checks below only report the fields that did parse.
        let defaults = RawPatientInput::default();
        let mut errors = Vec::new();

        let mut decimal = |idx: usize, fallback: f64| -> f64 {
            let field = &self.fields[idx];
            match field.value.trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    errors.push(format!("{}: Invalid number", field.label));
                    fallback
                }
            }
        };

        let bp_systolic = decimal(SYSTOLIC, defaults.bp_systolic);
        let bp_diastolic = decimal(DIASTOLIC, defaults.bp_diastolic);
        let blood_urea = decimal(UREA, defaults.blood_urea);
        let serum_creatinine = decimal(CREATININE, defaults.serum_creatinine);
        let toxicity_score_composite = decimal(TOXICITY, defaults.toxicity_score_composite);
        let pk_toxic_interaction_score =
            decimal(PK_INTERACTION, defaults.pk_toxic_interaction_score);

        let patient_age = match self.fields[AGE].value.trim().parse::<u32>() {
            Ok(v) => v,
            Err(_) => {
                errors.push(format!("{}: Invalid whole number", self.fields[AGE].label));
                defaults.patient_age
            }
        };

        let label = |idx: usize| {
            self.fields[idx]
                .selected_label()
                .unwrap_or_default()
                .to_string()
        };

        let input = RawPatientInput {
            patient_age,
            bp_systolic,
            bp_diastolic,
            blood_urea,
            serum_creatinine,
            albumin: label(ALBUMIN),
            diabetes: label(DIABETES),
            hypertension: label(HYPERTENSION),
            nephrotoxic: label(NEPHROTOXIC),
            toxicity_score_composite,
            pk_toxic_interaction_score,
        };
        if let Err(range_errors) = input.validate() {
            errors.extend(range_errors);
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(errors)
        }
    }

    /// Load the reference scenario (systolic above the trained range).
    pub fn load_sample_data(&mut self) {
        self.fill(&RawPatientInput {
            patient_age: 50,
            bp_systolic: 190.0,
            bp_diastolic: 80.0,
            blood_urea: 1.0,
            serum_creatinine: 1.0,
            albumin: "Normal".to_string(),
            diabetes: "No history".to_string(),
            hypertension: "Diagnosed".to_string(),
            nephrotoxic: "Used".to_string(),
            toxicity_score_composite: 0.5,
            pk_toxic_interaction_score: 0.5,
        });
    }
}

/// Render the patient data input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let footer_height = if state.errors.is_empty() {
        3
    } else {
        (state.errors.len() as u16).saturating_add(2).min(8)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Min(0),                // Form
            Constraint::Length(footer_height), // Footer/errors
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Patient Data Entry", MedicalTheme::title()),
        Span::styled(
            " │ Chronic Kidney Disease Risk Factors",
            MedicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (MedicalTheme::border_focused(), MedicalTheme::focused())
        } else {
            (MedicalTheme::border(), MedicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![Span::raw(" ")];
        match field.selected_label() {
            Some(label) => {
                spans.push(Span::styled("◀ ", MedicalTheme::text_muted()));
                spans.push(Span::styled(label, MedicalTheme::text()));
                spans.push(Span::styled(" ▶", MedicalTheme::text_muted()));
            }
            None if field.value.is_empty() => {
                spans.push(Span::styled(field.hint.as_str(), MedicalTheme::text_muted()));
            }
            None => {
                spans.push(Span::styled(field.value.as_str(), MedicalTheme::text()));
                spans.push(Span::styled(
                    format!("  {}", field.hint),
                    MedicalTheme::text_muted(),
                ));
            }
        }
        if is_selected && field.selected_label().is_none() {
            spans.insert(2, Span::styled("▌", MedicalTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content: Vec<Line> = if state.errors.is_empty() {
        vec![Line::from(vec![
            Span::styled("[↑↓/Tab] ", MedicalTheme::key_hint()),
            Span::styled("Navigate ", MedicalTheme::key_desc()),
            Span::styled("[←→] ", MedicalTheme::key_hint()),
            Span::styled("Change ", MedicalTheme::key_desc()),
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Assess ", MedicalTheme::key_desc()),
            Span::styled("[S] ", MedicalTheme::key_hint()),
            Span::styled("Sample ", MedicalTheme::key_desc()),
            Span::styled("[Del] ", MedicalTheme::key_hint()),
            Span::styled("Clear ", MedicalTheme::key_desc()),
            Span::styled("[Esc/Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ])]
    } else {
        state
            .errors
            .iter()
            .map(|err| {
                Line::from(vec![
                    Span::styled("! ", MedicalTheme::danger()),
                    Span::styled(err.as_str(), MedicalTheme::danger()),
                ])
            })
            .collect()
    };

    let footer = Paragraph::new(content).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_form_yields_default_input() {
        let state = PatientFormState::default();
        assert_eq!(state.fields.len(), 11);
        assert_eq!(state.to_raw_input(), Ok(RawPatientInput::default()));
    }

    #[test]
    fn test_sample_data_round_trips() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        let raw = state.to_raw_input().expect("sample is valid");
        assert_eq!(raw.bp_systolic, 190.0);
        assert_eq!(raw.hypertension, "Diagnosed");
        assert_eq!(raw.nephrotoxic, "Used");
    }

    #[test]
    fn test_choice_cycles_both_ways() {
        let mut state = PatientFormState::default();
        state.selected_field = ALBUMIN;
        state.cycle_choice(true);
        assert_eq!(
            state.fields[ALBUMIN].selected_label(),
            Some("Mild Hypoalbuminemia")
        );
        state.cycle_choice(false);
        state.cycle_choice(false);
        assert_eq!(
            state.fields[ALBUMIN].selected_label(),
            Some("Severe Hypoalbuminemia")
        );
    }

    #[test]
    fn test_typing_follows_field_kind() {
        let mut state = PatientFormState::default();
        state.clear_field();
        for c in "4x.5".chars() {
            state.input_char(c);
        }
        assert_eq!(state.fields[AGE].value, "45");

        state.selected_field = CREATININE;
        state.clear_field();
        for c in "1.2.3".chars() {
            state.input_char(c);
        }
        assert_eq!(state.fields[CREATININE].value, "1.23");

        state.selected_field = DIABETES;
        state.input_char('1');
        assert!(state.fields[DIABETES].value.is_empty());
    }

    #[test]
    fn test_all_violations_are_reported() {
        let mut state = PatientFormState::default();
        state.fields[AGE].value = "12".into();
        state.fields[SYSTOLIC].value = "260".into();
        state.fields[TOXICITY].value = "1.5".into();
        let errors = state.to_raw_input().unwrap_err();
        assert_eq!(errors.len(), 3);

        state.fields[UREA].value.clear();
        state.fields[PK_INTERACTION].value = ".".into();
        let errors = state.to_raw_input().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.iter().filter(|e| e.contains("Invalid")).count(), 2);
        assert!(errors.iter().any(|e| e.starts_with("Age 12")));
        assert!(errors.iter().any(|e| e.starts_with("Systolic BP 260")));
    }

    #[test]
    fn test_parse_errors_do_not_hide_range_errors() {
        let mut state = PatientFormState::default();
        state.fields[AGE].value.clear();
        state.fields[CREATININE].value = "7".into();
        let errors = state.to_raw_input().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Age: Invalid whole number");
        assert!(errors[1].starts_with("Serum creatinine 7"));
    }

    #[test]
    fn test_clear_sensitive_wipes_buffers() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| f.value.is_empty()));
    }
}
