//! Utility modules

pub mod content;
pub mod time;

pub use content::ContentGenerator;
