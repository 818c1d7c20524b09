//! Terminal UI for the interactive remote
//!
//! Built with ratatui. Keyboard-first: every remote button has a key.

pub mod controls;
pub mod theme;
pub mod view;

pub use controls::{Action, Controls, InputMode};
pub use theme::Theme;
