pub mod aggregate;
pub mod arrival;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod fetch;
pub mod format;
pub mod parser;
pub mod runtime;
pub mod source;
