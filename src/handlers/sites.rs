use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::config::Config;
use crate::models::pulumi::*;
use crate::models::site::*;
use crate::pulumi::{PulumiError, StackCreation};

/// Stack output holding the provisioned site's address.
const WEBSITE_URL_OUTPUT: &str = "websiteUrl";

/// Region the site program deploys into.
const AWS_REGION: &str = "us-west-2";

/// Log the upstream failure and hand the caller a generic 500.
fn internal_error(context: &str, err: PulumiError) -> (StatusCode, String) {
    tracing::error!("Internal Server Error: {context}: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
}

/// Settings stored on a stack when its site is created. Later deployments
/// inherit them.
pub fn deployment_settings(config: &Config) -> DeploymentSettings {
    DeploymentSettings {
        source_context: Some(SourceContext {
            git: GitContext {
                branch: config.branch.clone(),
                repo_dir: config.dir.clone(),
            },
        }),
        operation_context: Some(OperationContext {
            environment: [("AWS_REGION".to_string(), AWS_REGION.to_string())].into(),
            oidc: Some(OidcContext {
                aws: Some(AwsOidcContext {
                    role_arn: config.role_arn.clone(),
                    session_name: config.session_name.clone(),
                }),
            }),
        }),
        github: Some(GitHubContext {
            repository: config.repository.clone(),
            paths: config.trigger_paths(),
            deploy_commits: true,
            preview_pull_requests: false,
        }),
    }
}

fn website_url(outputs: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    outputs
        .get(WEBSITE_URL_OUTPUT)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

pub async fn create_site(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req: CreateSiteRequest = serde_json::from_slice(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "failed to parse create request".to_string()))?;

    let stack = state.stack(&req.id);
    let created = state
        .pulumi
        .create_stack(stack)
        .await
        .map_err(|e| internal_error("creating stack", e))?;
    match created {
        StackCreation::Created => {
            tracing::info!(
                "created stack '{}/{}/{}'",
                stack.org,
                stack.project,
                stack.name
            );
        }
        StackCreation::AlreadyExists => {
            tracing::info!(
                "stack '{}/{}/{}' already exists",
                stack.org,
                stack.project,
                stack.name
            );
        }
    }

    state
        .pulumi
        .configure_deployment(stack, &deployment_settings(&state.config))
        .await
        .map_err(|e| internal_error("configuring deployment", e))?;

    state
        .pulumi
        .update_stack(stack, &req.content)
        .await
        .map_err(|e| internal_error("starting deployment", e))?;

    Ok((StatusCode::ACCEPTED, Json(SiteResponse::accepted(req.id))))
}

pub async fn get_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stack = state.stack(&id);

    let operation = state
        .pulumi
        .current_operation(stack)
        .await
        .map_err(|e| internal_error("getting stack", e))?;
    if let Some(op) = &operation {
        tracing::debug!(
            "site {id}: {} by {} in progress since {:?}",
            op.kind,
            op.author,
            op.started_at()
        );
    }
    let status = SiteStatus::from_operation(operation.as_ref());

    let outputs = state
        .pulumi
        .stack_outputs(stack)
        .await
        .map_err(|e| internal_error("getting stack outputs", e))?;
    let url = outputs.as_ref().and_then(website_url);

    Ok(Json(SiteResponse {
        id,
        url,
        status: Some(status),
    }))
}

pub async fn update_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req: UpdateSiteRequest = serde_json::from_slice(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "failed to parse update request".to_string()))?;

    state
        .pulumi
        .update_stack(state.stack(&id), &req.content)
        .await
        .map_err(|e| internal_error("starting deployment", e))?;

    Ok(StatusCode::ACCEPTED)
}

pub async fn delete_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .pulumi
        .destroy_stack(state.stack(&id))
        .await
        .map_err(|e| internal_error("starting deployment", e))?;

    Ok(StatusCode::ACCEPTED)
}
