//! Request and response bodies of the Pulumi Cloud REST API, limited to the
//! fields this service reads or writes.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// The only export schema version whose resource layout we understand.
pub const DEPLOYMENT_SCHEMA_VERSION: i64 = 3;

/// Resource type of the root stack resource in an export.
pub const ROOT_STACK_TYPE: &str = "pulumi:pulumi:Stack";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<OperationContext>,
    #[serde(default, rename = "gitHub", skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    pub git: GitContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_dir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    #[serde(
        default,
        rename = "environmentVariables",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub environment: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<OidcContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OidcContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsOidcContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsOidcContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deploy_commits: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preview_pull_requests: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentOperation {
    Update,
    Destroy,
}

/// Body of `POST /preview/{org}/{project}/{stack}/deployments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    #[serde(flatten)]
    pub settings: DeploymentSettings,
    pub inherit_settings: bool,
    pub operation: DeploymentOperation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStackRequest {
    pub stack_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub kind: String,
    #[serde(default)]
    pub author: String,
    /// Unix seconds.
    #[serde(default)]
    pub started: i64,
}

impl OperationStatus {
    pub fn started_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.started, 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStackResponse {
    #[serde(default)]
    pub current_operation: Option<OperationStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub github_login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetUserResponse {
    #[serde(default)]
    pub organizations: Vec<OrganizationSummary>,
}

/// Export envelope. The deployment body is only decoded once the version
/// is known.
#[derive(Debug, Deserialize)]
pub struct UntypedDeployment {
    pub version: i64,
    pub deployment: Box<RawValue>,
}

/// Exports write empty collections as `null`; read those as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
pub struct DeploymentV3 {
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<ResourceV3>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceV3 {
    #[serde(default, deserialize_with = "null_as_default")]
    pub urn: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: serde_json::Map<String, serde_json::Value>,
}

impl DeploymentV3 {
    /// Outputs of the first root stack resource, if the export has one.
    pub fn stack_outputs(self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.resources
            .into_iter()
            .find(|r| r.resource_type == ROOT_STACK_TYPE)
            .map(|r| r.outputs)
    }
}

/// Identifies one stack within an organization and project.
#[derive(Debug, Clone, Copy)]
pub struct StackRef<'a> {
    pub org: &'a str,
    pub project: &'a str,
    pub name: &'a str,
}

impl StackRef<'_> {
    /// `{org}/{project}/{stack}` with each segment percent-encoded.
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            urlencoding::encode(self.org),
            urlencoding::encode(self.project),
            urlencoding::encode(self.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_destroy_request_omits_settings() {
        let req = CreateDeploymentRequest {
            settings: DeploymentSettings::default(),
            inherit_settings: true,
            operation: DeploymentOperation::Destroy,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "inheritSettings": true, "operation": "destroy" })
        );
    }

    #[test]
    fn test_update_request_flattens_environment() {
        let req = CreateDeploymentRequest {
            settings: DeploymentSettings {
                operation_context: Some(OperationContext {
                    environment: HashMap::from([(
                        "SITE_CONTENT".to_string(),
                        "<h1>hi</h1>".to_string(),
                    )]),
                    oidc: None,
                }),
                ..Default::default()
            },
            inherit_settings: true,
            operation: DeploymentOperation::Update,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "operationContext": {
                    "environmentVariables": { "SITE_CONTENT": "<h1>hi</h1>" }
                },
                "inheritSettings": true,
                "operation": "update"
            })
        );
    }

    #[test]
    fn test_stack_outputs_picks_root_resource() {
        let deployment: DeploymentV3 = serde_json::from_value(json!({
            "manifest": { "time": "2024-01-01T00:00:00Z" },
            "resources": [
                {
                    "urn": "urn:pulumi:blog::site::pulumi:providers:aws::default",
                    "type": "pulumi:providers:aws"
                },
                {
                    "urn": "urn:pulumi:blog::site::pulumi:pulumi:Stack::site-blog",
                    "type": "pulumi:pulumi:Stack",
                    "outputs": { "websiteUrl": "http://blog.s3-website.amazonaws.com" }
                },
                {
                    "urn": "urn:pulumi:blog::site::pulumi:pulumi:Stack::other",
                    "type": "pulumi:pulumi:Stack",
                    "outputs": { "websiteUrl": "http://wrong" }
                }
            ]
        }))
        .unwrap();
        let outputs = deployment.stack_outputs().unwrap();
        assert_eq!(
            outputs["websiteUrl"],
            json!("http://blog.s3-website.amazonaws.com")
        );
    }

    #[test]
    fn test_stack_outputs_without_root_resource() {
        let deployment: DeploymentV3 =
            serde_json::from_value(json!({ "resources": [] })).unwrap();
        assert!(deployment.stack_outputs().is_none());
    }

    #[test]
    fn test_null_collections_read_as_empty() {
        let deployment: DeploymentV3 = serde_json::from_value(json!({
            "resources": [
                { "urn": null, "type": "pulumi:pulumi:Stack", "outputs": null }
            ]
        }))
        .unwrap();
        assert!(deployment.stack_outputs().unwrap().is_empty());

        let deployment: DeploymentV3 =
            serde_json::from_value(json!({ "resources": null })).unwrap();
        assert!(deployment.stack_outputs().is_none());
    }

    #[test]
    fn test_stack_ref_path_encodes_segments() {
        let stack = StackRef {
            org: "acme",
            project: "sites",
            name: "my site",
        };
        assert_eq!(stack.path(), "acme/sites/my%20site");
    }

    #[test]
    fn test_operation_started_at() {
        let op: OperationStatus = serde_json::from_value(json!({
            "kind": "update",
            "author": "octocat",
            "started": 1_700_000_000
        }))
        .unwrap();
        assert_eq!(
            op.started_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
