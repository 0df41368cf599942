// View state and the action handlers that mutate it
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api_client::{Advice, AdviceClient};
use crate::history::{History, QueryRecord};
use crate::plant_client::{DiagnosisClient, DiagnosisResult};
use crate::prompt::suggestion;
use crate::ui::UiEvent;

/// Outbound work requested by an action; run off the UI thread by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Advise { query: String },
    Diagnose { path: PathBuf },
}

#[derive(Clone)]
pub struct Services {
    pub advice: Arc<dyn AdviceClient>,
    pub diagnosis: Arc<dyn DiagnosisClient>,
}

pub async fn perform(effect: Effect, services: &Services) -> UiEvent {
    match effect {
        Effect::Advise { query } => {
            let advice = services.advice.get_farming_advice(&query).await;
            UiEvent::Advice { query, advice }
        }
        Effect::Diagnose { path } => {
            let outcome = services
                .diagnosis
                .identify_plant_disease(&path)
                .await
                .map_err(|e| e.to_string());
            UiEvent::Diagnosis { outcome }
        }
    }
}

pub struct AdvisorState {
    pub query: String,
    pub response: String,
    pub advice_loading: bool,
    pub diagnosis: Option<DiagnosisResult>,
    pub diagnosis_loading: bool,
    pub selected_file: Option<PathBuf>,
    /// Blocking notice; the UI holds input until it is dismissed.
    pub alert: Option<String>,
    pub notice: Option<String>,
    history: History,
}

impl AdvisorState {
    pub fn new(history: History) -> Self {
        Self {
            query: String::new(),
            response: String::new(),
            advice_loading: false,
            diagnosis: None,
            diagnosis_loading: false,
            selected_file: None,
            alert: None,
            notice: None,
            history,
        }
    }

    pub fn history(&self) -> &[QueryRecord] {
        self.history.records()
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    pub fn use_suggestion(&mut self, index: usize) {
        if let Some(s) = suggestion(index) {
            self.query = s.to_string();
        }
    }

    pub fn submit(&mut self) -> Option<Effect> {
        let query = self.query.trim();
        if query.is_empty() || self.advice_loading {
            return None;
        }
        let query = query.to_string();
        self.advice_loading = true;
        self.notice = None;
        info!(chars = query.len(), "submitting advice query");
        Some(Effect::Advise { query })
    }

    pub fn select_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !path.is_file() {
            self.alert = Some(format!("No image file at {}", path.display()));
            return;
        }
        self.selected_file = Some(path);
        self.diagnosis = None;
    }

    pub fn diagnose(&mut self) -> Option<Effect> {
        if self.diagnosis_loading {
            return None;
        }
        let Some(path) = self.selected_file.clone() else {
            self.alert = Some("Please select an image first.".into());
            return None;
        };
        self.diagnosis_loading = true;
        self.notice = None;
        info!(image = %path.display(), "submitting diagnosis");
        Some(Effect::Diagnose { path })
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Advice { query, advice } => {
                self.advice_loading = false;
                self.response = advice.text().to_string();
                if let Advice::Answer(response) = advice {
                    if let Err(e) = self.history.push(QueryRecord { query, response }) {
                        warn!(error = %e, "could not persist history");
                        self.notice = Some("History could not be saved".into());
                    }
                }
            }
            UiEvent::Diagnosis { outcome } => {
                self.diagnosis_loading = false;
                match outcome {
                    Ok(result) => self.diagnosis = Some(result),
                    Err(e) => {
                        self.diagnosis = Some(DiagnosisResult::default());
                        self.notice = Some(format!("Diagnosis failed: {e}"));
                    }
                }
            }
        }
    }

    pub fn replay(&mut self, index: usize) {
        if let Some(record) = self.history.get(index) {
            self.query = record.query.clone();
            self.response = record.response.clone();
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn clear_history(&mut self) {
        if let Err(e) = self.history.clear() {
            warn!(error = %e, "could not clear stored history");
            self.notice = Some("History could not be cleared".into());
        }
    }
}
