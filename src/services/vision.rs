use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::verification::FailureReason;

/// What the vision model saw in a unit photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAssessment {
    pub trash_can_present: bool,
    pub no_trash_bag_visible: bool,
    pub door_number_matches: bool,
    pub door_number_detected: bool,
}

impl PhotoAssessment {
    /// The result used when photo verification is switched off.
    pub fn auto_pass() -> Self {
        Self {
            trash_can_present: true,
            no_trash_bag_visible: true,
            door_number_matches: true,
            door_number_detected: true,
        }
    }

    /// Reasons the photo fails. Empty means it passes.
    ///
    /// With `missing_trash_can` only the door number is checked.
    pub fn failure_reasons(&self, missing_trash_can: bool) -> Vec<FailureReason> {
        let mut reasons = Vec::new();
        if !missing_trash_can {
            if !self.trash_can_present {
                reasons.push(FailureReason::TrashCanNotVisible);
            }
            if !self.no_trash_bag_visible {
                reasons.push(FailureReason::TrashBagVisible);
            }
        }
        if !self.door_number_matches {
            reasons.push(if self.door_number_detected {
                FailureReason::DoorNumberMismatch
            } else {
                FailureReason::DoorNumberMissing
            });
        }
        reasons
    }
}

#[async_trait]
pub trait VisionVerifier: Send + Sync {
    async fn assess_photo(
        &self,
        image_bytes: &[u8],
        expected_unit: &str,
    ) -> Result<PhotoAssessment, VisionError>;
}

/// Passes every photo.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledVision;

#[async_trait]
impl VisionVerifier for DisabledVision {
    async fn assess_photo(
        &self,
        _image_bytes: &[u8],
        _expected_unit: &str,
    ) -> Result<PhotoAssessment, VisionError> {
        Ok(PhotoAssessment::auto_pass())
    }
}

/// Client for Cloudflare Workers AI LLaVA model.
pub struct WorkersAiVision {
    http: Client,
    account_id: String,
    api_token: String,
}

#[derive(Serialize)]
struct LlavaRequest {
    image: String,
    prompt: String,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct LlavaResponse {
    result: LlavaResult,
}

#[derive(Deserialize)]
struct LlavaResult {
    description: String,
}

impl WorkersAiVision {
    pub fn new(account_id: &str, api_token: &str) -> Result<Self, VisionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(VisionError::Http)?;
        Ok(Self {
            http,
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn prompt(expected_unit: &str) -> String {
        format!(
            "This photo should show the front door of apartment unit {expected_unit} during trash pickup. \
             Answer as JSON with boolean fields: trash_can_present (a trash can is visible), \
             no_trash_bag_visible (no loose trash bag is left out), door_number_detected \
             (any door number is readable), door_number_matches (the readable number is \
             {expected_unit}). \
             Return ONLY valid JSON with these exact field names."
        )
    }
}

#[async_trait]
impl VisionVerifier for WorkersAiVision {
    async fn assess_photo(
        &self,
        image_bytes: &[u8],
        expected_unit: &str,
    ) -> Result<PhotoAssessment, VisionError> {
        let url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/@cf/llava-hf/llava-1.5-7b-hf",
            self.account_id
        );

        let request_body = LlavaRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            prompt: Self::prompt(expected_unit),
            max_tokens: 256,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await
            .map_err(VisionError::Http)?
            .error_for_status()
            .map_err(VisionError::Http)?;

        let llava_resp: LlavaResponse = response.json().await.map_err(VisionError::Http)?;
        parse_assessment(&llava_resp.result.description)
    }
}

/// Pull the JSON object out of the model's free-text answer.
fn parse_assessment(description: &str) -> Result<PhotoAssessment, VisionError> {
    let start = description.find('{');
    let end = description.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &description[s..=e],
        _ => return Err(VisionError::NoJson(description.chars().take(120).collect())),
    };
    serde_json::from_str(json).map_err(VisionError::Parse)
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse LLaVA response as a photo assessment: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLaVA response contained no JSON object: {0}")]
    NoJson(String),
}
