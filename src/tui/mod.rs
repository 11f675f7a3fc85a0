//! TUI module: Terminal User Interface using Ratatui.
//!
//! Two screens:
//! - Patient data input
//! - Color-coded risk result with recommendations

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
