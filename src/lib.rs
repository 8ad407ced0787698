#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod feed;
pub mod logging;
pub mod pagination;
pub mod pipeline;
pub mod post;
pub mod preferences;
pub mod selection;
pub mod store;
pub mod ui;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
