//! Risk result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::{Assessment, RISK_PROFILES};
use crate::tui::styles::MedicalTheme;

/// Result screen state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    /// Nothing assessed yet
    #[default]
    Idle,
    /// Completed with result
    Complete { assessment: Assessment },
    /// Assessment failed
    Error { message: String },
}

/// Render the result screen
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_result_header(f, chunks[0]);
    match state {
        ResultState::Idle => render_idle(f, chunks[1]),
        ResultState::Complete { assessment } => render_assessment(f, chunks[1], assessment),
        ResultState::Error { message } => render_error(f, chunks[1], message),
    }
    render_result_footer(f, chunks[2]);
}

fn render_result_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Risk Assessment", MedicalTheme::title()),
        Span::styled(" │ Chronic Kidney Disease", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(Line::from(Span::styled(
        "Enter patient data to begin",
        MedicalTheme::text_muted(),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &Assessment) {
    let level = assessment.risk_level;
    let profile = level.profile();
    let risk_style = MedicalTheme::risk_level(level);

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", profile.label),
            risk_style.add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(risk_style);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let proba_height = if assessment.probabilities.is_some() {
        RISK_PROFILES.len() as u16 * 3
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Risk level
            Constraint::Length(proba_height), // Probabilities
            Constraint::Min(0),               // Recommendations
        ])
        .margin(1)
        .split(inner);

    let mut headline = vec![Line::from(Span::styled(
        profile.label.to_uppercase(),
        risk_style.add_modifier(Modifier::BOLD),
    ))];
    if let Some(confidence) = assessment.confidence() {
        headline.push(Line::from(vec![
            Span::styled("Confidence: ", MedicalTheme::text_secondary()),
            Span::styled(format!("{:.1}%", confidence * 100.0), MedicalTheme::text()),
        ]));
    }
    f.render_widget(
        Paragraph::new(headline).alignment(Alignment::Center),
        chunks[0],
    );

    if let Some(probabilities) = assessment.probabilities {
        render_probabilities(f, chunks[1], &probabilities);
    }

    let mut lines = vec![
        Line::from(Span::styled("Recommendations", MedicalTheme::subtitle())),
        Line::from(""),
    ];
    lines.extend(profile.recommendations.iter().map(|rec| {
        Line::from(vec![
            Span::styled(" • ", risk_style),
            Span::styled(*rec, MedicalTheme::text()),
        ])
    }));
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }),
        chunks[2],
    );
}

fn render_probabilities(f: &mut Frame, area: Rect, probabilities: &[f64; 3]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(RISK_PROFILES.iter().map(|_| Constraint::Length(3)))
        .split(area);

    for (profile, (p, row)) in RISK_PROFILES
        .iter()
        .zip(probabilities.iter().zip(rows.iter()))
    {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(Span::styled(
                        format!(" {} ", profile.label),
                        MedicalTheme::text_secondary(),
                    ))
                    .borders(Borders::ALL)
                    .border_style(MedicalTheme::border()),
            )
            .gauge_style(MedicalTheme::risk_level(profile.level))
            .ratio(p.clamp(0.0, 1.0))
            .label(format!("{:.1}%", p * 100.0));
        f.render_widget(gauge, *row);
    }
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Assessment failed", MedicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, MedicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_result_footer(f: &mut Frame, area: Rect) {
    let content = Line::from(vec![
        Span::styled("[Enter] ", MedicalTheme::key_hint()),
        Span::styled("Edit Inputs ", MedicalTheme::key_desc()),
        Span::styled("[N] ", MedicalTheme::key_hint()),
        Span::styled("New Assessment ", MedicalTheme::key_desc()),
        Span::styled("[Esc/Q] ", MedicalTheme::key_hint()),
        Span::styled("Quit", MedicalTheme::key_desc()),
    ]);

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLevel;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(state: &ResultState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).expect("terminal");
        terminal
            .draw(|f| render_result(f, f.area(), state))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_high_risk_panel_shows_profile() {
        let assessment = Assessment::new(RiskLevel::High, Some([0.1, 0.2, 0.7]));
        let screen = rendered(&ResultState::Complete { assessment });
        assert!(screen.contains("HIGH RISK"));
        assert!(screen.contains("Refer to nephrology"));
        assert!(screen.contains("70.0%"));
    }

    #[test]
    fn test_error_panel_shows_message() {
        let screen = rendered(&ResultState::Error {
            message: "Unrecognized risk code 7".into(),
        });
        assert!(screen.contains("Assessment failed"));
        assert!(screen.contains("Unrecognized risk code 7"));
    }
}
