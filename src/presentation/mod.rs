// Presentation layer - Console rendering of dashboard views
pub mod console;
