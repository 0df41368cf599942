// Plant disease identification client
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseCandidate {
    pub name: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthAssessment {
    pub status: String,
}

/// Canonical diagnosis shape handed to the view, whatever the provider returned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosisResult {
    pub diseases: Vec<DiseaseCandidate>,
    pub health_assessment: Option<HealthAssessment>,
}

impl DiagnosisResult {
    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty() && self.health_assessment.is_none()
    }
}

#[async_trait]
pub trait DiagnosisClient: Send + Sync {
    async fn identify_plant_disease(&self, image: &Path) -> Result<DiagnosisResult, ClientError>;
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(alias = "plant_name")]
    name: String,
    #[serde(default)]
    probability: f64,
}

#[derive(Debug, Deserialize)]
struct RawHealth {
    status: Option<String>,
    is_healthy: Option<bool>,
    #[serde(default)]
    diseases: Vec<RawCandidate>,
}

#[derive(Debug, Deserialize)]
struct RawDiagnosis {
    #[serde(default)]
    suggestions: Vec<RawCandidate>,
    #[serde(default)]
    diseases: Vec<RawCandidate>,
    #[serde(alias = "healthAssessment")]
    health_assessment: Option<RawHealth>,
}

fn normalize(raw: RawDiagnosis) -> DiagnosisResult {
    let RawDiagnosis { suggestions, diseases, health_assessment } = raw;
    let (status, health_diseases) = match health_assessment {
        Some(h) => {
            let status = h.status.or_else(|| {
                h.is_healthy.map(|ok| if ok { "healthy" } else { "diseased" }.to_string())
            });
            (status, h.diseases)
        }
        None => (None, Vec::new()),
    };

    let source = [health_diseases, diseases, suggestions]
        .into_iter()
        .find(|list| !list.is_empty())
        .unwrap_or_default();

    DiagnosisResult {
        diseases: source
            .into_iter()
            .map(|c| DiseaseCandidate {
                name: c.name,
                probability: if c.probability.is_nan() { 0.0 } else { c.probability.clamp(0.0, 1.0) },
            })
            .collect(),
        health_assessment: status.map(|status| HealthAssessment { status }),
    }
}

fn mime_for(path: &Path) -> mime_guess::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

pub struct PlantIdClient {
    http: Client,
    api_key: String,
    base_url: String,
    organs: Option<String>,
}

impl PlantIdClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        organs: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            organs: organs.filter(|o| !o.trim().is_empty()).map(str::to_string),
        })
    }

    async fn identify(&self, image: &Path) -> Result<DiagnosisResult, ClientError> {
        let bytes = tokio::fs::read(image).await.map_err(|source| ClientError::ImageRead {
            path: image.to_path_buf(),
            source,
        })?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(image).as_ref())?;
        let mut form = multipart::Form::new()
            .part("images", part)
            .text("api_key", self.api_key.clone());
        if let Some(organs) = &self.organs {
            form = form.text("organs", organs.clone());
        }

        let res = self
            .http
            .post(format!("{}/v2/identify", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ClientError::status(status, &body));
        }
        let raw: RawDiagnosis = serde_json::from_str(&body)?;
        Ok(normalize(raw))
    }
}

#[async_trait]
impl DiagnosisClient for PlantIdClient {
    async fn identify_plant_disease(&self, image: &Path) -> Result<DiagnosisResult, ClientError> {
        debug!(image = %image.display(), "identifying plant disease");
        self.identify(image).await.map_err(|e| {
            error!(error = %e, "error identifying plant disease");
            e
        })
    }
}
