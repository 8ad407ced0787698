use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::controller::{Controller, LoadState};
use crate::data;
use crate::feed::Source;
use crate::logging;
use crate::preferences::{self, MemoryPreferences, PreferenceStore, SqlitePreferences};
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub feed_override: Option<String>,
    pub demo: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let log_status = start_logging(&cfg);

    let source = resolve_source(&cfg, &opts)?;
    let controller = start_controller(&cfg);
    let feed_service = data::service_for(&source, &cfg.feed).context("prepare feed")?;

    let mut status_message = format!(
        "Config: {}",
        friendly_path(config::default_path().as_ref())
    );
    if let Some(warning) = log_status {
        status_message = warning;
    }

    let mut model = ui::Model::new(ui::Options {
        status_message,
        source_label: source.describe(),
        feed_service,
        controller,
    });
    model.run()
}

pub fn list<W: Write>(opts: RunOptions, out: &mut W) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    if let Some(warning) = start_logging(&cfg) {
        eprintln!("{warning}");
    }

    let source = resolve_source(&cfg, &opts)?;
    let mut controller = start_controller(&cfg);
    let feed_service = data::service_for(&source, &cfg.feed).context("prepare feed")?;
    controller.load_posts(feed_service.load_posts());

    if let LoadState::Failed(message) = controller.load_state() {
        anyhow::bail!("load posts from {}: {}", source.describe(), message);
    }

    let view = controller.view();
    writeln!(out, "{}", view.summary())?;
    for record in &view.posts {
        writeln!(out)?;
        writeln!(out, "{}", record.title)?;
        if !record.description.trim().is_empty() {
            writeln!(out, "  {}", record.description.trim())?;
        }
        writeln!(out, "  {}", record.formatted_date)?;
        if !record.tags.is_empty() {
            let tags: Vec<String> = record.tags.iter().map(|tag| format!("#{tag}")).collect();
            writeln!(out, "  {}", tags.join(" "))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn start_logging(cfg: &Config) -> Option<String> {
    match logging::init(&cfg.log) {
        Ok(()) => None,
        Err(err) => Some(format!("Logging disabled: {err:#}")),
    }
}

fn resolve_source(cfg: &Config, opts: &RunOptions) -> Result<Source> {
    if opts.demo {
        return Ok(Source::Demo);
    }
    let raw = opts.feed_override.as_deref().unwrap_or(&cfg.feed.url);
    Source::parse(raw).context("resolve feed source")
}

fn start_controller(cfg: &Config) -> Controller {
    let prefs = open_preferences(cfg.storage.path.clone());
    let mut controller = Controller::new(prefs, cfg.search.mode());
    controller.start();
    controller
}

/// Falls back to an in-memory slot so an unwritable data directory only
/// costs persistence across runs.
fn open_preferences(path: Option<PathBuf>) -> Box<dyn PreferenceStore> {
    match SqlitePreferences::open(preferences::Options { path }) {
        Ok(store) => Box::new(store),
        Err(err) => {
            let message = format!("{err:#}");
            tracing::warn!(error = %message, "preferences unavailable, not persisting");
            Box::new(MemoryPreferences::new())
        }
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/post-feed/config.yaml".to_string()
    }
}
