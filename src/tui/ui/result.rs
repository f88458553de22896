//! Prediction result panel.

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::domain::Prediction;
use crate::tui::styles::LabTheme;

/// Result panel state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    /// Nothing submitted yet
    #[default]
    Idle,
    Predicted(Prediction),
    /// A categorical value the encoders do not know
    EncodingFailed(String),
    /// Any other prediction failure
    Failed(String),
}

impl ResultState {
    /// The message shown for a failed submission.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::EncodingFailed(detail) => Some(format!("Error while encoding input: {detail}")),
            Self::Failed(detail) => Some(format!("Prediction failed: {detail}")),
            Self::Idle | Self::Predicted(_) => None,
        }
    }
}

/// Render the result panel
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let (lines, border_style) = match state {
        ResultState::Idle => (
            vec![Line::from(Span::styled(
                "Fill in the form and press Enter to predict the enzyme class",
                LabTheme::text_muted(),
            ))],
            LabTheme::border(),
        ),
        ResultState::Predicted(prediction) => {
            let class = prediction.class();
            let description = class.map_or("Class code not recognized", |c| c.description());
            (
                vec![
                    Line::from(vec![
                        Span::styled("Predicted Class: ", LabTheme::text_secondary()),
                        Span::styled(
                            prediction.label.to_string(),
                            LabTheme::enzyme_class(class),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled(description, LabTheme::text_secondary()),
                        Span::styled(
                            format!(" │ via {}", prediction.source),
                            LabTheme::text_muted(),
                        ),
                    ]),
                ],
                LabTheme::border_focused(),
            )
        }
        ResultState::EncodingFailed(_) | ResultState::Failed(_) => (
            vec![Line::from(Span::styled(
                state.message().unwrap_or_default(),
                LabTheme::danger(),
            ))],
            LabTheme::danger(),
        ),
    };

    let block = Block::default()
        .title(Span::styled(" Result ", LabTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(border_style);

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_are_distinguished() {
        let encoding = ResultState::EncodingFailed("unrecognized chainId 'Z'".into());
        assert_eq!(
            encoding.message().as_deref(),
            Some("Error while encoding input: unrecognized chainId 'Z'")
        );

        let other = ResultState::Failed("model error".into());
        assert_eq!(
            other.message().as_deref(),
            Some("Prediction failed: model error")
        );

        assert!(ResultState::Idle.message().is_none());
    }
}
