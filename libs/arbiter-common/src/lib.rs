pub mod config;
pub mod languages;
pub mod types;

pub use config::{JudgeConfig, PollSettings};
pub use languages::{JudgeLanguage, LanguageRegistry, UnknownLanguage};
