/// State management module
///
/// This module handles all session state, including:
/// - Circle data structures (data.rs)
/// - Settings and their defaults (settings.rs)
/// - Zoom, pan and coordinate mapping (view.rs)
/// - Manual circles and removal marks (annotations.rs)
/// - The event-driven session tying them together (session.rs)

pub mod annotations;
pub mod data;
pub mod session;
pub mod settings;
pub mod view;
