//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, menu, status bar and overlays
//! - `pages`: page bodies (tables, record details, dashboard, forms)
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod pages;
pub mod render;
pub mod styles;
