use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ApiError;

// @module: Hevy workouts API client

/// One set of an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    /// Position within the exercise
    #[serde(default)]
    pub index: u32,
    /// Set type (normal, warmup, dropset, failure)
    #[serde(rename = "type", default)]
    pub set_type: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub rpe: Option<f64>,
}

/// One exercise performed during a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub index: u32,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

/// A logged workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// One page of the workouts listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPage {
    /// 1-based page number
    pub page: u32,
    /// Total number of pages reported by the API
    pub page_count: u32,
    #[serde(default)]
    pub workouts: Vec<Workout>,
}

/// Source of paginated workouts
#[async_trait]
pub trait WorkoutSource: Send + Sync {
    /// Fetch the 1-based page `page`
    async fn fetch_page(&self, page: u32) -> Result<WorkoutPage, ApiError>;
}

/// Walk pages from 1 until the reported page count is exhausted
pub async fn fetch_all_workouts<S: WorkoutSource + ?Sized>(source: &S) -> Result<Vec<Workout>, ApiError> {
    let mut workouts = Vec::new();
    let mut page = 1;

    loop {
        let current = source.fetch_page(page).await?;
        debug!(
            "Fetched workouts page {}/{} ({} workouts)",
            current.page,
            current.page_count,
            current.workouts.len()
        );

        let empty = current.workouts.is_empty();
        workouts.extend(current.workouts);
        if empty || page >= current.page_count {
            break;
        }
        page += 1;
    }

    info!("Fetched {} workouts over {} page(s)", workouts.len(), page);
    Ok(workouts)
}

/// HTTP client for the Hevy public API
pub struct HevyClient {
    /// HTTP client for API requests
    client: Client,
    /// API key sent in the `api-key` header
    api_key: String,
    /// Base endpoint, e.g. `https://api.hevyapp.com/v1`
    endpoint: String,
    /// Workouts per page
    page_size: u32,
}

impl HevyClient {
    /// Create a new Hevy client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, page_size: u32, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            page_size: page_size.max(1),
        }
    }

    /// URL of the workouts listing for `page`
    pub fn page_url(&self, page: u32) -> Result<Url, ApiError> {
        let base = format!("{}/workouts", self.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base).map_err(|e| ApiError::RequestFailed(format!("Invalid endpoint '{}': {}", base, e)))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &self.page_size.to_string());
        Ok(url)
    }
}

#[async_trait]
impl WorkoutSource for HevyClient {
    async fn fetch_page(&self, page: u32) -> Result<WorkoutPage, ApiError> {
        let url = self.page_url(page)?;

        let response = self
            .client
            .get(url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::AuthenticationError(format!("Hevy API rejected the key ({})", status)));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Hevy API error ({}): {}", status, message);
            return Err(ApiError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json::<WorkoutPage>()
            .await
            .map_err(|e| ApiError::ParseError(e.to_string()))
    }
}
