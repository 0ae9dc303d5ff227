//! Analysis history request and response models

use run_checkpoint::HistoryRecord;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::execution::SopBucket;

/// Body of `POST /analyze/history`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<SopBucket>>,
    #[serde(default)]
    pub is_complete: Option<bool>,
}

impl SaveHistoryRequest {
    /// Results are mandatory; a blank name falls back to the default
    pub fn validate(&self) -> ApiResult<&[SopBucket]> {
        self.results
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Valid analysis results are required".to_string()))
    }
}

/// Body of `PUT /analyze/history/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct RenameHistoryRequest {
    #[serde(default)]
    pub name: String,
}

/// Body of `PUT /analyze/history/:id/status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_complete: bool,
}

/// A history record as stored, with `results` left as serialized text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub name: String,
    pub results: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_complete: bool,
    pub last_processed_index: Option<String>,
}

impl From<HistoryRecord> for HistoryItem {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            results: record.results,
            user_id: record.user_id,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            is_complete: record.is_complete,
            last_processed_index: record.last_processed_index,
        }
    }
}

/// A single history record with `results` and the cursor parsed back to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDetail {
    pub id: String,
    pub name: String,
    pub results: serde_json::Value,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_complete: bool,
    pub last_processed_index: Option<serde_json::Value>,
}

impl TryFrom<HistoryRecord> for HistoryDetail {
    type Error = ApiError;

    fn try_from(record: HistoryRecord) -> ApiResult<Self> {
        let last_processed_index = record
            .last_processed_index
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Self {
            results: serde_json::from_str(&record.results)?,
            last_processed_index,
            id: record.id,
            name: record.name,
            user_id: record.user_id,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            is_complete: record.is_complete,
        })
    }
}

/// Body of a successful `DELETE /analyze/history/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteHistoryResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record() -> HistoryRecord {
        HistoryRecord {
            id: "abc".to_string(),
            name: "Analysis".to_string(),
            results: r#"[{"sop":"S1","analyses":[]}]"#.to_string(),
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_complete: false,
            last_processed_index: Some(r#"{"sopIndex":0,"transcriptIndex":1}"#.to_string()),
        }
    }

    #[test]
    fn test_detail_parses_stored_text() {
        let detail = HistoryDetail::try_from(record()).unwrap();
        assert_eq!(detail.results, json!([{"sop": "S1", "analyses": []}]));
        assert_eq!(
            detail.last_processed_index,
            Some(json!({"sopIndex": 0, "transcriptIndex": 1}))
        );
    }

    #[test]
    fn test_detail_rejects_corrupt_results() {
        let mut corrupt = record();
        corrupt.results = "not json".to_string();
        assert!(HistoryDetail::try_from(corrupt).is_err());
    }

    #[test]
    fn test_save_request_requires_results() {
        let req: SaveHistoryRequest = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(req.validate().is_err());

        let req: SaveHistoryRequest =
            serde_json::from_value(json!({"results": [], "isComplete": true})).unwrap();
        assert!(req.validate().unwrap().is_empty());
        assert_eq!(req.is_complete, Some(true));
    }
}
