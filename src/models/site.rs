use serde::{Deserialize, Serialize};

use super::pulumi::OperationStatus;

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    Idle,
    Updating,
    Deleting,
}

impl SiteStatus {
    /// A site is idle unless the stack has an operation in flight; a
    /// pending destroy means the site is going away.
    pub fn from_operation(operation: Option<&OperationStatus>) -> Self {
        match operation {
            None => SiteStatus::Idle,
            Some(op) if op.kind == "destroy" => SiteStatus::Deleting,
            Some(_) => SiteStatus::Updating,
        }
    }
}

/// Response body for `GET /sites/{id}`. Create responds with the same
/// shape carrying only the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SiteStatus>,
}

impl SiteResponse {
    pub fn accepted(id: String) -> Self {
        Self {
            id,
            url: None,
            status: None,
        }
    }
}
