use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use site_deployer::AppState;
use site_deployer::config::Config;
use site_deployer::pulumi::PulumiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("site_deployer=debug,tower_http=debug")
        }))
        .init();

    let config = Config::parse();
    config.validate()?;

    let pulumi = PulumiClient::new(&config.api_url, &config.api_token);

    let org = match &config.org {
        Some(org) => org.clone(),
        None => {
            let org = pulumi
                .default_organization()
                .await
                .context("getting default organization")?;
            tracing::info!("using default organization '{org}'");
            org
        }
    };

    let addr = config.addr.clone();
    let state = AppState {
        config: Arc::new(config),
        org: org.into(),
        pulumi,
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("site-deployer listening on {addr}");
    axum::serve(listener, site_deployer::app(state)).await?;

    Ok(())
}
