mod ui; mod api_client; mod plant_client; mod controller; mod history; mod local_storage;
mod prompt; mod markdown; mod config; mod error; mod logging;

use std::sync::Arc;
use std::sync::mpsc;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use ui::{run_loop, UiEvent};
use api_client::GeminiClient;
use plant_client::PlantIdClient;
use controller::{perform, AdvisorState, Effect, Services};
use config::Config;
use history::History;
use local_storage::LocalStorage;

fn main() -> anyhow::Result<()> {
    let cfg = Config::load();
    logging::init(&cfg.log_path())?;
    if cfg.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; advice requests will fail");
    }
    if cfg.plant_id_api_key.is_empty() {
        warn!("PLANT_ID_API_KEY is not set; diagnosis requests will fail");
    }

    let services = Services {
        advice: Arc::new(GeminiClient::new(
            &cfg.gemini_api_key,
            &cfg.gemini_model,
            &cfg.gemini_base_url,
            cfg.timeout(),
        )?),
        diagnosis: Arc::new(PlantIdClient::new(
            &cfg.plant_id_api_key,
            &cfg.plant_id_base_url,
            cfg.organs(),
            cfg.timeout(),
        )?),
    };

    let storage = LocalStorage::open(cfg.storage_path());
    let path = storage.path().to_path_buf();
    let history = History::load(storage);
    info!(storage = %path.display(), entries = history.len(), empty = history.is_empty(), "history loaded");
    let state = AdvisorState::new(history);

    let rt = Arc::new(Runtime::new()?);
    let (tx, rx) = mpsc::channel::<UiEvent>();

    // Each effect runs on the runtime and reports back to the UI thread.
    run_loop(rx, state, move |effect: Effect| {
        let services = services.clone();
        let tx = tx.clone();
        rt.spawn(async move {
            let event = perform(effect, &services).await;
            let _ = tx.send(event);
        });
    })?;

    info!("exiting");
    Ok(())
}
