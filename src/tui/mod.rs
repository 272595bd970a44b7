//! TUI (Terminal User Interface) module
//!
//! Admin console for the clinic chat. State lives in `App`; rendering lives in
//! `ui` so the binary stays a thin event loop.

pub mod app;
pub mod types;
pub mod ui;

pub use app::App;
pub use types::{AppEvent, Screen};
