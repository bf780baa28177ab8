use std::sync::Arc;

use printchat_agent::gateway::{CloudprinterGateway, GatewayError};
use printchat_agent::llm::{LlmError, OpenAiCompatibleClient};
use printchat_agent::prompts::assistant_system_prompt;
use printchat_agent::runtime::AgentRuntime;
use printchat_agent::shop::default_registry;
use printchat_core::catalog::{Catalog, CatalogError};
use printchat_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::SessionRegistry;
use crate::routes::AppState;
use crate::web::init_templates;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog load failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("cloudprinter gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Arc::new(Catalog::load(&config.catalog.path)?);
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        path = %config.catalog.path.display(),
        products = catalog.len(),
        categories = catalog.categories().len(),
        "product catalog loaded"
    );

    let gateway = Arc::new(CloudprinterGateway::from_config(&config.cloudprinter)?);
    if !gateway.has_api_key() {
        warn!(
            event_name = "system.bootstrap.cloudprinter_key_missing",
            correlation_id = "bootstrap",
            "no cloudprinter api key configured; product info and pricing calls will be rejected upstream"
        );
    }

    let llm = OpenAiCompatibleClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %llm.model(),
        base_url = %config.llm.effective_base_url(),
        "llm client configured"
    );

    let tools = Arc::new(default_registry(catalog.clone(), gateway));
    let runtime =
        AgentRuntime::new(Arc::new(llm), tools, assistant_system_prompt(), config.chat.max_rounds);

    let state = AppState {
        catalog,
        sessions: Arc::new(SessionRegistry::new(runtime)),
        templates: init_templates(),
    };

    Ok(Application { config, state })
}
