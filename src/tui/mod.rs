//! TUI module: Terminal User Interface using Ratatui.
//!
//! A single page: the sample form, the result panel below it, and a
//! footer of key hints.

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::LabTheme;
