use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::fixture::Feed;
use crate::genai::{ClientConfig, GeminiClient, GenerativeService, MockService};
use crate::logging;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    run_with(RunOptions::default())
}

pub fn run_with(options: RunOptions) -> Result<()> {
    let cfg = load_config(&options)?;
    let _log_guard = logging::init(&cfg.log).context("init logging")?;
    let config_path = options.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());

    let feed = Feed::load(cfg.feed.fixture_path.as_deref()).context("load feed")?;
    let posts = feed.take(cfg.feed.max_posts);
    tracing::info!(posts = posts.len(), config = %display_path, "starting");

    let (service, status) = build_service(&cfg);

    let options = ui::Options {
        status_message: status,
        posts,
        service,
        fetch_images: true,
        config: cfg,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    tracing::info!("exiting");
    Ok(())
}

pub fn load_config(options: &RunOptions) -> Result<Config> {
    config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")
}

/// Picks the live Gemini client when a key is configured, otherwise the
/// offline stand-in. The returned string is the opening status line.
fn build_service(cfg: &Config) -> (Arc<dyn GenerativeService>, String) {
    let lab = &cfg.lab;
    if lab.api_key.trim().is_empty() {
        tracing::warn!("no api key configured, labs run offline");
        return (
            Arc::new(MockService),
            "Modo offline: defina lab.api_key ou GEMINI_API_KEY para ativar os labs.".to_string(),
        );
    }

    let client = GeminiClient::new(ClientConfig {
        api_key: lab.api_key.clone(),
        base_url: lab.base_url.clone(),
        chat_model: lab.chat_model.clone(),
        image_model: lab.image_model.clone(),
        timeout: Some(lab.request_timeout),
        user_agent: format!("thoth/{}", crate::VERSION),
        http_client: None,
    });
    match client {
        Ok(client) => (
            Arc::new(client),
            "Bem-vindo à Thoth. F1 feed · F2 chat · F3 vision · q sair".to_string(),
        ),
        Err(err) => {
            tracing::error!(error = %err, "gemini client failed to build");
            (
                Arc::new(MockService),
                format!("Falha ao iniciar o cliente Gemini ({err}). Labs offline."),
            )
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
        "~/.config/thoth/config.yaml".to_string()
    }
}
