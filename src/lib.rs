#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod card;
pub mod collage;
pub mod config;
pub mod dropdown;
pub mod feed;
pub mod fixture;
pub mod genai;
pub mod lab;
pub mod logging;
pub mod markdown;
pub mod preview;
pub mod shell;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
