//! Configuration service for symgate

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::infra::path_policy::PathPolicy;
use crate::models::config::SymgateConfig;

pub const PROJECT_CONFIG_FILE: &str = ".symgate.toml";

#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn load(&self) -> Result<SymgateConfig, ConfigError>;
    fn config_path(&self, global: bool) -> PathBuf;
}

pub struct DefaultConfigService {
    root: PathBuf,
    global_path: PathBuf,
}

impl DefaultConfigService {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            global_path: Self::global_config_path(),
        }
    }

    /// Use an explicit global config file instead of the XDG location
    pub fn with_global_path(mut self, path: PathBuf) -> Self {
        self.global_path = path;
        self
    }

    fn global_config_path() -> PathBuf {
        // XDG standard: ~/.config/symgate/config.toml
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("symgate")
            .join("config.toml")
    }

    fn project_config_path(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILE)
    }

    async fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(toml::Table::new());
        }
        tracing::debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        content.parse::<toml::Table>().map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Global file, then project file, then environment
    pub async fn load_with_env<F>(&self, env: F) -> Result<SymgateConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table = Self::read_table(&self.global_path).await?;
        merge_tables(&mut table, Self::read_table(&self.project_config_path()).await?);

        let config: SymgateConfig =
            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: self.project_config_path().display().to_string(),
                    message: e.to_string(),
                })?;

        apply_env_overrides(config, env)
    }
}

#[async_trait]
impl ConfigService for DefaultConfigService {
    async fn load(&self) -> Result<SymgateConfig, ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    fn config_path(&self, global: bool) -> PathBuf {
        if global {
            self.global_path.clone()
        } else {
            self.project_config_path()
        }
    }
}

/// Overlay `overlay` onto `base`; nested tables merge key by key
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn apply_env_overrides<F>(mut config: SymgateConfig, env: F) -> Result<SymgateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("SYMGATE_BACKEND") {
        config.lsp.mode = parse_env("SYMGATE_BACKEND", &val)?;
    }
    if let Some(val) = env("SYMGATE_HOST") {
        config.lsp.host = val;
    }
    if let Some(val) = env("SYMGATE_PORT") {
        config.lsp.port = parse_env("SYMGATE_PORT", &val)?;
    }
    if let Some(val) = env("SYMGATE_SERVER_COMMAND") {
        let mut parts = val.split_whitespace().map(String::from);
        if let Some(command) = parts.next() {
            config.lsp.command = command;
            config.lsp.args = parts.collect();
        }
    }
    if let Some(val) = env("SYMGATE_SETTLE_MS") {
        config.lsp.settle_delay_ms = Some(parse_env("SYMGATE_SETTLE_MS", &val)?);
    }
    if let Some(val) = env("ALLOWED_DIRECTORIES") {
        config.paths.allowed_directories = PathPolicy::parse_list(&val);
    }
    if let Some(val) = env("LOG_DIR")
        && !val.trim().is_empty()
    {
        config.log.dir = Some(PathBuf::from(val));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::BackendMode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> DefaultConfigService {
        DefaultConfigService::new(&dir.path().join("project"))
            .with_global_path(dir.path().join("global").join("config.toml"))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    async fn write(path: PathBuf, content: &str) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = service(&dir).load_with_env(no_env).await.unwrap();
        assert_eq!(config.lsp.mode, BackendMode::Socket);
        assert_eq!(config.lsp.port, 5870);
    }

    #[tokio::test]
    async fn test_project_overlays_global_per_key() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        write(
            svc.config_path(true),
            "[lsp]\nmode = \"stdio\"\ncommand = \"tsls\"\nport = 9000\n",
        )
        .await;
        write(svc.config_path(false), "[lsp]\nport = 7000\n").await;

        let config = svc.load_with_env(no_env).await.unwrap();
        assert_eq!(config.lsp.mode, BackendMode::Stdio);
        assert_eq!(config.lsp.command, "tsls");
        assert_eq!(config.lsp.port, 7000);
    }

    #[tokio::test]
    async fn test_env_overrides_files() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        write(svc.config_path(false), "[lsp]\nport = 7000\n").await;

        let env: HashMap<&str, &str> = HashMap::from([
            ("SYMGATE_BACKEND", "stdio"),
            ("SYMGATE_PORT", "7100"),
            ("SYMGATE_SERVER_COMMAND", "deno lsp"),
            ("SYMGATE_SETTLE_MS", "200"),
            ("ALLOWED_DIRECTORIES", "/a,/b"),
            ("LOG_DIR", "/tmp/logs"),
        ]);
        let config = svc
            .load_with_env(|k| env.get(k).map(|v| v.to_string()))
            .await
            .unwrap();

        assert_eq!(config.lsp.mode, BackendMode::Stdio);
        assert_eq!(config.lsp.port, 7100);
        assert_eq!(config.lsp.command, "deno");
        assert_eq!(config.lsp.args, vec!["lsp"]);
        assert_eq!(config.lsp.settle_delay_ms, Some(200));
        assert_eq!(
            config.paths.allowed_directories,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.log.dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[tokio::test]
    async fn test_invalid_env_value() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir)
            .load_with_env(|k| (k == "SYMGATE_PORT").then(|| "not-a-port".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SYMGATE_PORT"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        write(svc.config_path(false), "[lsp\nport = ").await;

        let err = svc.load_with_env(no_env).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_tables_nested() {
        let mut base: toml::Table = "[lsp]\nhost = \"h\"\nport = 1\n[log]\ndir = \"/x\"\n"
            .parse()
            .unwrap();
        let overlay: toml::Table = "[lsp]\nport = 2\n".parse().unwrap();
        merge_tables(&mut base, overlay);

        assert_eq!(base["lsp"]["host"].as_str(), Some("h"));
        assert_eq!(base["lsp"]["port"].as_integer(), Some(2));
        assert_eq!(base["log"]["dir"].as_str(), Some("/x"));
    }
}
