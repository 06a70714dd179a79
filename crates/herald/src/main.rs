use std::sync::Arc;

use herald_core::{completion::CompletionClient, config::Config};
use herald_llm::HttpCompletionClient;

#[tokio::main]
async fn main() -> Result<(), herald_core::Error> {
    herald_core::logging::init("herald")?;

    let cfg = Arc::new(Config::load()?);

    let client: Arc<dyn CompletionClient> = Arc::new(HttpCompletionClient::new(
        cfg.completion_api_base.clone(),
        cfg.completion_api_key.clone(),
        cfg.completion_model.clone(),
        cfg.completion_timeout,
    ));

    herald_telegram::router::run_polling(cfg, client)
        .await
        .map_err(|e| herald_core::Error::Messaging(format!("telegram bot failed: {e}")))?;

    Ok(())
}
