use clap::Parser;

pub const DEFAULT_API_URL: &str = "https://api.pulumi.com/api";

/// Startup configuration. Every flag can also be supplied through the
/// environment (a `.env` file is loaded first by `main`).
#[derive(Debug, Clone, Parser)]
#[command(
    name = "site-deployer",
    version,
    about = "REST front-end for Pulumi-managed static sites"
)]
pub struct Config {
    /// The GitHub repository that contains the site's Pulumi program.
    #[arg(long = "repo", env = "SITE_REPO", required = true)]
    pub repository: String,

    /// The git branch that contains the site's Pulumi program.
    #[arg(long, env = "SITE_BRANCH", default_value = "main")]
    pub branch: String,

    /// The subdirectory of the repository that contains the site's Pulumi program.
    #[arg(long, env = "SITE_DIR", default_value = "")]
    pub dir: String,

    /// The AWS IAM role ARN used for OIDC integration.
    #[arg(long, env = "SITE_ROLE_ARN", required = true)]
    pub role_arn: String,

    /// The session name used for AWS OIDC integration.
    #[arg(long, env = "SITE_SESSION_NAME", default_value = "site-deploy")]
    pub session_name: String,

    /// The Pulumi API token.
    #[arg(
        long = "token",
        env = "PULUMI_ACCESS_TOKEN",
        required = true,
        hide_env_values = true
    )]
    pub api_token: String,

    /// The Pulumi organization. Defaults to the token owner's first organization.
    #[arg(long, env = "PULUMI_ORG")]
    pub org: Option<String>,

    /// The Pulumi project to deploy.
    #[arg(long, env = "PULUMI_PROJECT", required = true)]
    pub project: String,

    /// The address to listen on.
    #[arg(long, env = "SITE_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Base URL of the Pulumi Cloud REST API.
    #[arg(long, env = "PULUMI_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl Config {
    /// Reject required values that were supplied but are blank, which clap
    /// accepts as present.
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("repo", &self.repository),
            ("role-arn", &self.role_arn),
            ("token", &self.api_token),
            ("project", &self.project),
        ];
        for (flag, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("the --{flag} flag must not be blank");
            }
        }
        if self.org.as_deref().is_some_and(|org| org.trim().is_empty()) {
            anyhow::bail!("the --org flag must not be empty when set");
        }
        Ok(())
    }

    /// Trigger path filter restricting deploys to the configured subdirectory.
    pub fn trigger_paths(&self) -> Vec<String> {
        if self.dir.is_empty() {
            Vec::new()
        } else {
            vec![format!("{}/**", self.dir)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["site-deployer"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    fn complete() -> Config {
        parse(&[
            "--repo",
            "acme/sites",
            "--role-arn",
            "arn:aws:iam::123456789012:role/deploy",
            "--token",
            "pul-abc",
            "--project",
            "static-site",
        ])
    }

    #[test]
    fn test_defaults() {
        let config = complete();
        assert_eq!(config.branch, "main");
        assert_eq!(config.session_name, "site-deploy");
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.dir.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_required_flag() {
        let err = Config::try_parse_from([
            "site-deployer",
            "--repo",
            "acme/sites",
            "--token",
            "pul-abc",
            "--project",
            "static-site",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("--role-arn"));
    }

    #[test]
    fn test_blank_required_values() {
        let mut config = complete();
        config.role_arn.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "the --role-arn flag must not be blank");

        let mut config = complete();
        config.api_token = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "the --token flag must not be blank");
    }

    #[test]
    fn test_empty_org_rejected() {
        let mut config = complete();
        config.org = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trigger_paths() {
        let mut config = complete();
        assert!(config.trigger_paths().is_empty());
        config.dir = "sites/static".to_string();
        assert_eq!(config.trigger_paths(), vec!["sites/static/**".to_string()]);
    }
}
