//! Request and response payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

fn default_true() -> bool {
    true
}

/// Request for the next question in a section.
///
/// Unknown fields are forwarded to the engine as extra input parameters, so
/// questionnaire-specific context (dealer ids, channel flags) flows through
/// without server changes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionRequest {
    pub section_id: String,
    pub application_id: String,
    pub applicant_id: String,
    #[serde(default = "default_true")]
    pub is_primary_flow: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Json>,
}

impl NextQuestionRequest {
    /// Engine input parameters: the named fields plus any extras.
    pub fn params(&self) -> serde_json::Map<String, Json> {
        let mut params = self.extra.clone();
        params.insert("sectionId".to_string(), Json::String(self.section_id.clone()));
        params.insert(
            "applicationId".to_string(),
            Json::String(self.application_id.clone()),
        );
        params.insert(
            "applicantId".to_string(),
            Json::String(self.applicant_id.clone()),
        );
        params.insert("isPrimaryFlow".to_string(), Json::Bool(self.is_primary_flow));
        params
    }
}

/// Request to record an answer against the dev backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub applicant_id: String,
    pub application_id: String,
    pub question_id: String,
    pub value: Json,
}

/// Acknowledgement for a recorded answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub message: String,
    pub datapoint_id: i64,
}
