//! Thin async client for the Pulumi Cloud REST API.
//!
//! Every call carries `Authorization: token <token>` and expects JSON back.
//! Non-success statuses surface as [`PulumiError::Status`] with the raw
//! response body so callers can log what the API said.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::pulumi::{
    CreateDeploymentRequest, CreateStackRequest, DEPLOYMENT_SCHEMA_VERSION, DeploymentOperation,
    DeploymentSettings, DeploymentV3, GetStackResponse, GetUserResponse, OperationContext,
    OperationStatus, StackRef, UntypedDeployment,
};

/// Environment variable the site program reads its content from.
pub const SITE_CONTENT_ENV: &str = "SITE_CONTENT";

#[derive(Debug, thiserror::Error)]
pub enum PulumiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("user belongs to no organizations")]
    NoOrganizations,
}

/// Result of registering a stack. Registration is idempotent, so a stack
/// that already exists is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCreation {
    Created,
    AlreadyExists,
}

#[derive(Clone)]
pub struct PulumiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl PulumiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, format!("token {}", self.token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PulumiError> {
        let url = self.url(path);
        debug!("GET {url}");
        let resp = self.authorized(self.http.get(&url)).send().await?;
        let body = expect_status(resp, &[StatusCode::OK]).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        accepted: &[StatusCode],
    ) -> Result<StatusCode, PulumiError> {
        let url = self.url(path);
        debug!("POST {url}");
        let resp = self.authorized(self.http.post(&url)).json(body).send().await?;
        let status = resp.status();
        expect_status(resp, accepted).await?;
        Ok(status)
    }

    /// `GET /user`: the organization login of the token owner's first
    /// organization.
    pub async fn default_organization(&self) -> Result<String, PulumiError> {
        let user: GetUserResponse = self.get_json("user").await?;
        user.organizations
            .into_iter()
            .next()
            .map(|org| org.github_login)
            .ok_or(PulumiError::NoOrganizations)
    }

    /// `POST /stacks/{org}/{project}`.
    pub async fn create_stack(&self, stack: StackRef<'_>) -> Result<StackCreation, PulumiError> {
        let path = format!(
            "stacks/{}/{}",
            urlencoding::encode(stack.org),
            urlencoding::encode(stack.project)
        );
        let body = CreateStackRequest {
            stack_name: stack.name.to_string(),
        };
        let status = self
            .post_json(&path, &body, &[StatusCode::OK, StatusCode::CONFLICT])
            .await?;
        Ok(if status == StatusCode::CONFLICT {
            StackCreation::AlreadyExists
        } else {
            StackCreation::Created
        })
    }

    /// `POST /preview/{org}/{project}/{stack}/deployment/settings`.
    pub async fn configure_deployment(
        &self,
        stack: StackRef<'_>,
        settings: &DeploymentSettings,
    ) -> Result<(), PulumiError> {
        let path = format!("preview/{}/deployment/settings", stack.path());
        self.post_json(&path, settings, &[StatusCode::OK]).await?;
        Ok(())
    }

    /// `POST /preview/{org}/{project}/{stack}/deployments`. The API answers
    /// 202 once the deployment is queued.
    pub async fn create_deployment(
        &self,
        stack: StackRef<'_>,
        req: &CreateDeploymentRequest,
    ) -> Result<(), PulumiError> {
        let path = format!("preview/{}/deployments", stack.path());
        self.post_json(&path, req, &[StatusCode::ACCEPTED]).await?;
        Ok(())
    }

    /// Queue an update that reuses the stack's stored settings and only
    /// overrides the site content.
    pub async fn update_stack(
        &self,
        stack: StackRef<'_>,
        content: &str,
    ) -> Result<(), PulumiError> {
        let req = CreateDeploymentRequest {
            settings: DeploymentSettings {
                operation_context: Some(OperationContext {
                    environment: [(SITE_CONTENT_ENV.to_string(), content.to_string())].into(),
                    oidc: None,
                }),
                ..Default::default()
            },
            inherit_settings: true,
            operation: DeploymentOperation::Update,
        };
        self.create_deployment(stack, &req).await
    }

    pub async fn destroy_stack(&self, stack: StackRef<'_>) -> Result<(), PulumiError> {
        let req = CreateDeploymentRequest {
            settings: DeploymentSettings::default(),
            inherit_settings: true,
            operation: DeploymentOperation::Destroy,
        };
        self.create_deployment(stack, &req).await
    }

    /// `GET /stacks/{org}/{project}/{stack}`: the operation in flight, if any.
    pub async fn current_operation(
        &self,
        stack: StackRef<'_>,
    ) -> Result<Option<OperationStatus>, PulumiError> {
        let resp: GetStackResponse = self.get_json(&format!("stacks/{}", stack.path())).await?;
        Ok(resp.current_operation)
    }

    /// `GET /stacks/{org}/{project}/{stack}/export`: outputs of the root stack
    /// resource. `None` when the export uses a schema version we don't know
    /// or has no root resource. A `null` deployment reads as one with no
    /// resources.
    pub async fn stack_outputs(
        &self,
        stack: StackRef<'_>,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, PulumiError> {
        let export: UntypedDeployment =
            self.get_json(&format!("stacks/{}/export", stack.path())).await?;
        if export.version != DEPLOYMENT_SCHEMA_VERSION {
            debug!(
                "stack {} export has schema version {}, skipping outputs",
                stack.name, export.version
            );
            return Ok(None);
        }
        let deployment: Option<DeploymentV3> = serde_json::from_str(export.deployment.get())?;
        Ok(deployment.unwrap_or_default().stack_outputs())
    }
}

/// Read the response body, failing unless the status is one of `accepted`.
async fn expect_status(
    resp: reqwest::Response,
    accepted: &[StatusCode],
) -> Result<String, PulumiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if accepted.contains(&status) {
        Ok(body)
    } else {
        Err(PulumiError::Status { status, body })
    }
}
