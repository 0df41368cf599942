use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

use crate::local_storage;

/// FarmAdvisor: farming advice and plant disease diagnosis in the terminal.
#[derive(Debug, Clone, Parser)]
#[command(name = "farmadvisor", version, about)]
pub struct Config {
    /// API key for the generative-text endpoint.
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    #[arg(long, env = "FARMADVISOR_GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "FARMADVISOR_GEMINI_URL", default_value = "https://generativelanguage.googleapis.com")]
    pub gemini_base_url: String,

    /// API key for the plant identification endpoint.
    #[arg(long, env = "PLANT_ID_API_KEY", default_value = "", hide_env_values = true)]
    pub plant_id_api_key: String,

    #[arg(long, env = "FARMADVISOR_PLANT_ID_URL", default_value = "https://api.plant.id")]
    pub plant_id_base_url: String,

    /// Organ hint sent with each image; empty to omit.
    #[arg(long, env = "FARMADVISOR_ORGANS", default_value = "leaf")]
    pub organs: String,

    /// Key/value file holding the question history.
    #[arg(long, env = "FARMADVISOR_STORAGE")]
    pub storage_file: Option<PathBuf>,

    #[arg(long, env = "FARMADVISOR_LOG")]
    pub log_file: Option<PathBuf>,

    #[arg(long, env = "FARMADVISOR_TIMEOUT", default_value_t = 35)]
    pub timeout_secs: u64,
}

impl Config {
    /// Loads `.env` if present, then parses flags with environment fallbacks.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_file.clone().unwrap_or_else(local_storage::default_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            local_storage::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("farmadvisor.log")
        })
    }

    pub fn organs(&self) -> Option<&str> {
        Some(self.organs.trim()).filter(|o| !o.is_empty())
    }
}
