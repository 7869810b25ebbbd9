use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix of environment overrides, e.g. `INKGATE__REPOSITORY__TOKEN`.
pub const ENV_PREFIX: &str = "INKGATE";

/// Conventional variable honored when no token is configured otherwise.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Starting configuration written by `inkgate init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# inkgate edge router configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

# Static site storage; clean URLs are rewritten to documents here
[origin]
base_url = "https://pages.example.com"

# Repository holding the markdown articles
[repository]
owner = "your-github-user"
repo = "your-site"
branch = "main"
articles_path = "articles"
# token = "..."  # or INKGATE__REPOSITORY__TOKEN / GITHUB_TOKEN

# Per-client gate in front of /utils/*
[rate_limit]
requests = 60
period = "1m"
client_ip_header = "CF-Connecting-IP"

[upstream]
timeout_secs = 10
max_concurrent_fetches = 8

[routing]
api_prefix = "/utils/"
clean_pages = ["about", "blog", "article"]

[logging]
level = "info"
json = true
"#;

/// Load configuration from a file using the config crate, layered with
/// environment overrides.
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml, // Default to TOML
    }
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    let path = Path::new(config_path);

    let settings = Config::builder()
        .add_source(File::new(
            path.to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
            file_format(path),
        ))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?;

    let mut server_config: ServerConfig = settings
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {}", path.display()))?;

    apply_token_fallback(&mut server_config, std::env::var(GITHUB_TOKEN_VAR).ok());

    Ok(server_config)
}

/// Fill in the repository token from the conventional variable when the
/// config and the prefixed environment left it empty.
pub fn apply_token_fallback(config: &mut ServerConfig, fallback: Option<String>) {
    let configured = config
        .repository
        .token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !configured {
        config.repository.token = fallback.filter(|t| !t.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
listen_addr = "127.0.0.1:3000"

[origin]
base_url = "https://pages.example"

[repository]
owner = "someone"
repo = "site"

[rate_limit]
requests = 10
period = "1m"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.origin.base_url, "https://pages.example");
        assert_eq!(config.repository.owner, "someone");
        assert_eq!(config.repository.branch, "main");
        assert_eq!(config.rate_limit.requests, 10);
        assert_eq!(config.rate_limit.client_ip_header, "CF-Connecting-IP");
        assert_eq!(config.routing.clean_pages, ["about", "blog", "article"]);
    }

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "0.0.0.0:8080"
origin:
  base_url: "https://pages.example"
repository:
  owner: "someone"
  repo: "site"
  branch: "published"
upstream:
  timeout_secs: 3
routing:
  clean_pages: ["about"]
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.repository.branch, "published");
        assert_eq!(config.upstream.timeout_secs, 3);
        assert_eq!(config.routing.clean_pages, ["about"]);
    }

    #[test]
    fn test_default_template_is_valid() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", DEFAULT_CONFIG_TEMPLATE).unwrap();

        let config = load_config_sync(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.repository.articles_path, "articles");
        assert!(crate::config::ServerConfigValidator::validate(&config).is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(load_config("/definitely/not/here.toml").await.is_err());
    }

    #[test]
    fn test_token_fallback() {
        let mut config = ServerConfig::default();
        apply_token_fallback(&mut config, Some("from-env".to_string()));
        assert_eq!(config.repository.token.as_deref(), Some("from-env"));

        let mut config = ServerConfig::default();
        config.repository.token = Some("configured".to_string());
        apply_token_fallback(&mut config, Some("from-env".to_string()));
        assert_eq!(config.repository.token.as_deref(), Some("configured"));

        let mut config = ServerConfig::default();
        apply_token_fallback(&mut config, Some("  ".to_string()));
        assert_eq!(config.repository.token, None);
    }
}
