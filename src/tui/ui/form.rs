//! Sample descriptor input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::num::IntErrorKind;
use zeroize::Zeroize;

use crate::domain::sample::{
    field, CHAIN_IDS, CRYSTALLIZATION_METHODS, EXPERIMENTAL_TECHNIQUES, MACROMOLECULE_TYPES,
};
use crate::domain::RawSample;
use crate::tui::styles::LabTheme;

/// A numeric spinner: an editable buffer with bounds and a step.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberInput {
    pub value: String,
    pub min: f64,
    pub max: Option<f64>,
    pub step: f64,
    /// Decimal places shown; 0 means the field takes whole numbers only
    pub precision: usize,
}

impl NumberInput {
    fn new(min: f64, max: Option<f64>, step: f64, precision: usize) -> Self {
        let mut input = Self {
            value: String::new(),
            min,
            max,
            step,
            precision,
        };
        input.value = input.format(min);
        input
    }

    fn format(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }

    fn accepts(&self, c: char) -> bool {
        c.is_ascii_digit() || c == '-' || (c == '.' && self.precision > 0)
    }

    fn clamp(&self, value: f64) -> f64 {
        let value = value.max(self.min);
        match self.max {
            Some(max) => value.min(max),
            None => value,
        }
    }

    /// Move one step up (`direction > 0`) or down, staying within bounds.
    ///
    /// An unparseable buffer restarts from the minimum.
    pub fn step_by(&mut self, direction: i8) {
        let current = self
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(self.min);
        let next = self.clamp(current + f64::from(direction.signum()) * self.step);
        self.value = self.format(next);
    }

    /// Parse the buffer and check it against the bounds.
    pub fn parse(&self) -> Result<f64, String> {
        let value: f64 = self
            .value
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| "Invalid number".to_string())?;

        let in_range = value >= self.min && self.max.map_or(true, |max| value <= max);
        if !in_range {
            return Err(match self.max {
                Some(max) => format!(
                    "Value must be between {} and {}",
                    self.format(self.min),
                    self.format(max)
                ),
                None => format!("Value must be at least {}", self.format(self.min)),
            });
        }
        if self.precision == 0 && value.fract() != 0.0 {
            return Err("Value must be a whole number".to_string());
        }

        Ok(value)
    }

    /// Parse a whole-number buffer without going through `f64`.
    ///
    /// Values beyond `i64` are reported instead of saturating.
    pub fn parse_whole(&self) -> Result<i64, String> {
        let text = self.value.trim();
        let value = match text.parse::<i64>() {
            Ok(value) => value,
            Err(e) => {
                return Err(match e.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        "Value is too large".to_string()
                    }
                    _ if text.parse::<f64>().is_ok_and(f64::is_finite) => {
                        "Value must be a whole number".to_string()
                    }
                    _ => "Invalid number".to_string(),
                });
            }
        };

        // Bounds of whole-number spinners are themselves whole numbers.
        let min = self.min as i64;
        let max = self.max.map(|max| max as i64);
        if value < min || max.is_some_and(|max| value > max) {
            return Err(match max {
                Some(max) => format!("Value must be between {min} and {max}"),
                None => format!("Value must be at least {min}"),
            });
        }

        Ok(value)
    }
}

/// The widget behind a form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Select {
        options: &'static [&'static str],
        index: usize,
    },
    Number(NumberInput),
    Text(String),
}

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    /// Column name in the raw record
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
    pub input: FieldInput,
}

impl FormField {
    fn select(key: &'static str, label: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            key,
            label,
            hint: "◀ ▶ to choose",
            input: FieldInput::Select { options, index: 0 },
        }
    }

    fn number(key: &'static str, label: &'static str, hint: &'static str, input: NumberInput) -> Self {
        Self {
            key,
            label,
            hint,
            input: FieldInput::Number(input),
        }
    }

    /// The value as displayed in the form.
    #[must_use]
    pub fn display_value(&self) -> &str {
        match &self.input {
            FieldInput::Select { options, index } => options.get(*index).copied().unwrap_or(""),
            FieldInput::Number(number) => &number.value,
            FieldInput::Text(text) => text,
        }
    }
}

/// Prediction form state
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            fields: vec![
                FormField::select(
                    field::EXPERIMENTAL_TECHNIQUE,
                    "Experimental Technique",
                    &EXPERIMENTAL_TECHNIQUES,
                ),
                FormField::select(
                    field::MACROMOLECULE_TYPE,
                    "Macromolecule Type",
                    &MACROMOLECULE_TYPES,
                ),
                FormField::number(
                    field::RESOLUTION,
                    "Resolution",
                    "angstrom (>= 0)",
                    NumberInput::new(0.0, None, 0.01, 2),
                ),
                FormField::select(
                    field::CRYSTALLIZATION_METHOD,
                    "Crystallization Method",
                    &CRYSTALLIZATION_METHODS,
                ),
                FormField::number(
                    field::CRYSTALLIZATION_TEMP_K,
                    "Crystallization Temp",
                    "kelvin (>= 0)",
                    NumberInput::new(0.0, None, 0.1, 1),
                ),
                FormField::number(
                    field::DENSITY_PERCENT_SOL,
                    "Solvent Content",
                    "% (>= 0)",
                    NumberInput::new(0.0, None, 0.01, 2),
                ),
                FormField::number(
                    field::PH_VALUE,
                    "pH",
                    "0-14",
                    NumberInput::new(0.0, Some(14.0), 0.01, 2),
                ),
                FormField::number(
                    field::PUBLICATION_YEAR,
                    "Publication Year",
                    "1900-2025",
                    NumberInput::new(1900.0, Some(2025.0), 1.0, 0),
                ),
                FormField::select(field::CHAIN_ID, "Chain ID", &CHAIN_IDS),
                FormField {
                    key: field::SEQUENCE,
                    label: "Sequence",
                    hint: "one-letter residue codes",
                    input: FieldInput::Text(String::new()),
                },
                FormField::number(
                    field::RESIDUE_COUNT,
                    "Residue Count",
                    "residues (>= 1)",
                    NumberInput::new(1.0, None, 1.0, 0),
                ),
            ],
            selected_field: 0,
            error_message: None,
        }
    }
}

/// A lysozyme-like record used by Ctrl+L.
const SAMPLE_DATA: [(&str, &str); 11] = [
    (field::EXPERIMENTAL_TECHNIQUE, "X-RAY DIFFRACTION"),
    (field::MACROMOLECULE_TYPE, "Protein"),
    (field::RESOLUTION, "1.65"),
    (field::CRYSTALLIZATION_METHOD, "VAPOR DIFFUSION, HANGING DROP"),
    (field::CRYSTALLIZATION_TEMP_K, "293.0"),
    (field::DENSITY_PERCENT_SOL, "39.52"),
    (field::PH_VALUE, "4.50"),
    (field::PUBLICATION_YEAR, "1998"),
    (field::CHAIN_ID, "A"),
    (
        field::SEQUENCE,
        "KVFGRCELAAAMKRHGLDNYRGYSLGNWVCAAKFESNFNTQATNRNTDGSTDYGILQINSRWWCNDGRTPGSRNLCNIPCSALLSSDITASVNCAKKIVSDGNGMNAWVAWRNRCKGTDVQAWIRGCRL",
    ),
    (field::RESIDUE_COUNT, "129"),
];

impl FormState {
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

    fn current(&mut self) -> &mut FieldInput {
        &mut self.fields[self.selected_field].input
    }

    /// Cycle a select or step a spinner; text fields ignore it.
    pub fn adjust(&mut self, direction: i8) {
        match self.current() {
            FieldInput::Select { options, index } => {
                let len = options.len();
                *index = if direction >= 0 {
                    (*index + 1) % len
                } else {
                    (*index + len - 1) % len
                };
            }
            FieldInput::Number(number) => number.step_by(direction),
            FieldInput::Text(_) => return,
        }
        self.error_message = None;
    }

    /// Add a character to the current field
    pub fn input_char(&mut self, c: char) {
        let accepted = match self.current() {
            FieldInput::Select { .. } => false,
            FieldInput::Number(number) => {
                let ok = number.accepts(c);
                if ok {
                    number.value.push(c);
                }
                ok
            }
            FieldInput::Text(text) => {
                let ok = !c.is_control();
                if ok {
                    text.push(c);
                }
                ok
            }
        };
        if accepted {
            self.error_message = None;
        }
    }

    /// Delete the last character
    pub fn delete_char(&mut self) {
        match self.current() {
            FieldInput::Number(number) => {
                number.value.pop();
            }
            FieldInput::Text(text) => {
                text.pop();
            }
            FieldInput::Select { .. } => {}
        }
    }

    /// Clear the current field; selects go back to their first option.
    pub fn clear_field(&mut self) {
        match self.current() {
            FieldInput::Select { index, .. } => *index = 0,
            FieldInput::Number(number) => number.value.zeroize(),
            FieldInput::Text(text) => text.zeroize(),
        }
    }

    /// Wipe every buffer and restore the form defaults.
    pub fn reset(&mut self) {
        for field in self.fields.iter_mut() {
            match &mut field.input {
                FieldInput::Number(number) => number.value.zeroize(),
                FieldInput::Text(text) => text.zeroize(),
                FieldInput::Select { .. } => {}
            }
        }
        *self = Self::default();
    }

    /// Load sample data for testing
    pub fn load_sample_data(&mut self) {
        for (key, value) in SAMPLE_DATA {
            let Some(entry) = self.fields.iter_mut().find(|f| f.key == key) else {
                continue;
            };
            match &mut entry.input {
                FieldInput::Select { options, index } => {
                    if let Some(position) = options.iter().position(|o| *o == value) {
                        *index = position;
                    }
                }
                FieldInput::Number(number) => number.value = value.to_string(),
                FieldInput::Text(text) => *text = value.to_string(),
            }
        }
        self.error_message = None;
    }

    fn field(&self, key: &str) -> Result<&FormField, String> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| format!("{key}: missing form field"))
    }

    fn text_of(&self, key: &str) -> Result<String, String> {
        let field = self.field(key)?;
        match &field.input {
            FieldInput::Number(_) => Err(format!("{}: expected a text field", field.label)),
            _ => Ok(field.display_value().to_string()),
        }
    }

    fn number_of(&self, key: &str) -> Result<f64, String> {
        let field = self.field(key)?;
        match &field.input {
            FieldInput::Number(number) => number
                .parse()
                .map_err(|e| format!("{}: {}", field.label, e)),
            _ => Err(format!("{}: expected a numeric field", field.label)),
        }
    }

    fn whole_number_of(&self, key: &str) -> Result<i64, String> {
        let field = self.field(key)?;
        match &field.input {
            FieldInput::Number(number) => number
                .parse_whole()
                .map_err(|e| format!("{}: {}", field.label, e)),
            _ => Err(format!("{}: expected a numeric field", field.label)),
        }
    }

    /// Validate and convert to a raw sample.
    pub fn to_raw_sample(&self) -> Result<RawSample, String> {
        Ok(RawSample {
            experimental_technique: self.text_of(field::EXPERIMENTAL_TECHNIQUE)?,
            macromolecule_type: self.text_of(field::MACROMOLECULE_TYPE)?,
            resolution: self.number_of(field::RESOLUTION)?,
            crystallization_method: self.text_of(field::CRYSTALLIZATION_METHOD)?,
            crystallization_temp_k: self.number_of(field::CRYSTALLIZATION_TEMP_K)?,
            density_percent_sol: self.number_of(field::DENSITY_PERCENT_SOL)?,
            ph_value: self.number_of(field::PH_VALUE)?,
            publication_year: self.whole_number_of(field::PUBLICATION_YEAR)?,
            chain_id: self.text_of(field::CHAIN_ID)?,
            sequence: self.text_of(field::SEQUENCE)?,
            residue_count: self.whole_number_of(field::RESIDUE_COUNT)?,
        })
    }
}

/// Render the sample input form
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Form
            Constraint::Length(2), // Footer/error
        ])
        .split(area);

    render_form_fields(f, chunks[0], state);
    render_form_footer(f, chunks[1], state);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

/// Keep the tail of long values visible, since that is where typing happens.
fn visible_tail(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if width == 0 || count <= width {
        return value.to_string();
    }
    let skip = count - width + 1;
    std::iter::once('…').chain(value.chars().skip(skip)).collect()
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let field_height = 3;
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let border_style = if is_selected {
            LabTheme::border_focused()
        } else {
            LabTheme::border()
        };

        let title_style = if is_selected {
            LabTheme::focused()
        } else {
            LabTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        // borders, leading space and cursor
        let width = usize::from(chunks[i].width.saturating_sub(4));
        let value = field.display_value();

        let mut spans = vec![Span::raw(" ")];
        match (&field.input, value.is_empty()) {
            (_, true) => spans.push(Span::styled(field.hint, LabTheme::text_muted())),
            (FieldInput::Select { .. }, false) if is_selected => {
                spans.push(Span::styled("◀ ", LabTheme::key_hint()));
                spans.push(Span::styled(value, LabTheme::text()));
                spans.push(Span::styled(" ▶", LabTheme::key_hint()));
            }
            (_, false) => spans.push(Span::styled(visible_tail(value, width), LabTheme::text())),
        }
        if is_selected && !matches!(field.input, FieldInput::Select { .. }) {
            spans.push(Span::styled("▌", LabTheme::cursor()));
        }

        let content = Paragraph::new(Line::from(spans)).block(block);
        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", LabTheme::warning()),
            Span::styled(err.clone(), LabTheme::warning()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", LabTheme::key_hint()),
            Span::styled("Navigate ", LabTheme::key_desc()),
            Span::styled("[←→] ", LabTheme::key_hint()),
            Span::styled("Change ", LabTheme::key_desc()),
            Span::styled("[Enter] ", LabTheme::key_hint()),
            Span::styled("Predict ", LabTheme::key_desc()),
            Span::styled("[Del] ", LabTheme::key_hint()),
            Span::styled("Clear ", LabTheme::key_desc()),
            Span::styled("[^L] ", LabTheme::key_hint()),
            Span::styled("Sample ", LabTheme::key_desc()),
            Span::styled("[^R] ", LabTheme::key_hint()),
            Span::styled("Reset ", LabTheme::key_desc()),
            Span::styled("[Esc] ", LabTheme::key_hint()),
            Span::styled("Quit", LabTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(LabTheme::border()),
    );

    f.render_widget(footer, area);
}
