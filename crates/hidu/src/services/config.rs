use super::types::{AppConfig, StorageBackend};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Local store used when no storage URI is configured, relative to the project root
pub const DEFAULT_LOCAL_STORE: &str = ".hidu/db/menu.lance";

/// Server config file read from the working directory when `HIDU_CONFIG` is unset
pub const DEFAULT_SERVER_CONFIG: &str = "hidu.toml";

/// Unprefixed variables honored for existing deployments
fn legacy_env() -> Env {
    Env::raw()
        .only(&["PORT", "MONGODB_URI", "CORS_ORIGIN"])
        .map(|key| {
            let key = key.as_str();
            if key.eq_ignore_ascii_case("PORT") {
                "server.port".into()
            } else if key.eq_ignore_ascii_case("MONGODB_URI") {
                "storage.uri".into()
            } else {
                "server.cors_origin".into()
            }
        })
}

impl AppConfig {
    /// Layered configuration: defaults, then `file` if it exists, then the
    /// legacy variables, then `HIDU_` variables (`__` separates sections).
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(file) = file.filter(|f| f.exists()) {
            figment = figment.merge(Toml::file(file));
        }

        figment
            .merge(legacy_env())
            .merge(Env::prefixed("HIDU_").split("__"))
    }

    /// Load configuration from an optional TOML file plus the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::figment(file)
            .extract()
            .context("Failed to load configuration")
    }

    /// Load server configuration from `HIDU_CONFIG`, or `hidu.toml` in the
    /// working directory, plus the environment
    pub fn load_server() -> Result<Self> {
        let file = std::env::var_os("HIDU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVER_CONFIG));
        Self::load(Some(&file))
    }

    /// Storage URI, falling back to the local store in the working directory
    pub fn storage_uri(&self) -> String {
        self.storage
            .uri
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_STORE.to_string())
    }
}

/// Service for project configuration management (`.hidu/config.toml`)
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    /// Create a new config service
    pub fn new(project_root: &Path) -> Self {
        let config_path = project_root.join(".hidu").join("config.toml");
        Self { config_path }
    }

    /// Initialize configuration with defaults and an optional storage URI
    pub fn init(&self, storage_uri: Option<String>) -> Result<AppConfig> {
        let mut config = AppConfig::default();
        config.storage.uri = storage_uri;
        self.save(&config)?;
        Ok(config)
    }

    /// Load configuration from file, with env var overrides
    pub fn load(&self) -> Result<AppConfig> {
        AppConfig::load(Some(&self.config_path))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get a configuration value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        match key {
            "server.host" => Ok(config.server.host),
            "server.port" => Ok(config.server.port.to_string()),
            "server.cors_origin" => Ok(config.server.cors_origin),
            "storage.uri" => Ok(config.storage.uri.unwrap_or_default()),
            "storage.database" => Ok(config.storage.database),
            "storage.collection" => Ok(config.storage.collection),
            "storage.connect_timeout_ms" => Ok(config.storage.connect_timeout_ms.to_string()),
            _ => Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
    }

    /// Set a configuration value by dotted key
    pub fn set(&self, key: &str, value: String) -> Result<()> {
        let mut config = self.load()?;
        match key {
            "server.host" => config.server.host = value,
            "server.port" => {
                config.server.port = value
                    .parse()
                    .with_context(|| format!("Invalid port: {}", value))?
            },
            "server.cors_origin" => config.server.cors_origin = value,
            "storage.uri" => config.storage.uri = Some(value),
            "storage.database" => config.storage.database = value,
            "storage.collection" => config.storage.collection = value,
            "storage.connect_timeout_ms" => {
                config.storage.connect_timeout_ms = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?
            },
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        self.save(&config)?;
        Ok(())
    }

    /// Resolve the storage URI from config. Relative local paths are
    /// resolved against the project root; remote URIs are kept as is.
    pub fn resolve_storage_uri(&self, project_root: &Path) -> Result<String> {
        let config = self.load()?;
        let uri = match &config.storage.uri {
            Some(uri)
                if uri.starts_with("s3://")
                    || StorageBackend::for_uri(uri) == StorageBackend::Mongo =>
            {
                uri.clone()
            },
            Some(uri) => project_root.join(uri).to_string_lossy().to_string(),
            None => project_root
                .join(DEFAULT_LOCAL_STORE)
                .to_string_lossy()
                .to_string(),
        };
        Ok(uri)
    }

    /// Check if configuration exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Run `f` inside a figment jail so tests that set variables cannot leak
    /// into tests that read them.
    fn isolated(f: impl FnOnce()) {
        figment::Jail::expect_with(|_| {
            f();
            Ok(())
        });
    }

    #[test]
    fn init_creates_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        assert!(!service.exists());

        let config = service.init(None).unwrap();
        assert!(service.exists());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn init_records_storage_uri() {
        isolated(|| {
            let temp_dir = TempDir::new().unwrap();
            let service = ConfigService::new(temp_dir.path());
            service
                .init(Some("mongodb://localhost:27017".to_string()))
                .unwrap();

            assert_eq!(
                service.get("storage.uri").unwrap(),
                "mongodb://localhost:27017"
            );
        });
    }

    #[test]
    fn set_then_get_round_trips() {
        isolated(|| {
            let temp_dir = TempDir::new().unwrap();
            let service = ConfigService::new(temp_dir.path());
            service.init(None).unwrap();

            service.set("server.port", "8080".to_string()).unwrap();
            service
                .set("storage.collection", "drinks".to_string())
                .unwrap();

            assert_eq!(service.get("server.port").unwrap(), "8080");
            assert_eq!(service.get("storage.collection").unwrap(), "drinks");
        });
    }

    #[test]
    fn set_rejects_invalid_port() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init(None).unwrap();

        assert!(service.set("server.port", "eighty".to_string()).is_err());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init(None).unwrap();

        assert!(service.get("model.name").is_err());
        assert!(service.set("model.name", "x".to_string()).is_err());
    }

    #[test]
    fn resolve_storage_uri_defaults_to_local() {
        isolated(|| {
            let temp_dir = TempDir::new().unwrap();
            let service = ConfigService::new(temp_dir.path());
            service.init(None).unwrap();

            let uri = service.resolve_storage_uri(temp_dir.path()).unwrap();
            let expected = temp_dir
                .path()
                .join(".hidu")
                .join("db")
                .join("menu.lance")
                .to_string_lossy()
                .to_string();
            assert_eq!(uri, expected);
        });
    }

    #[test]
    fn resolve_storage_uri_preserves_remote_uris() {
        isolated(|| {
            let temp_dir = TempDir::new().unwrap();
            let service = ConfigService::new(temp_dir.path());

            service
                .init(Some("s3://my-bucket/hidu/menu.lance".to_string()))
                .unwrap();
            assert_eq!(
                service.resolve_storage_uri(temp_dir.path()).unwrap(),
                "s3://my-bucket/hidu/menu.lance"
            );

            service
                .set("storage.uri", "mongodb+srv://cluster.example.net/hidu".to_string())
                .unwrap();
            assert_eq!(
                service.resolve_storage_uri(temp_dir.path()).unwrap(),
                "mongodb+srv://cluster.example.net/hidu"
            );
        });
    }

    #[test]
    fn resolve_storage_uri_resolves_relative_path() {
        isolated(|| {
            let temp_dir = TempDir::new().unwrap();
            let service = ConfigService::new(temp_dir.path());
            service.init(Some("custom/menu.lance".to_string())).unwrap();

            let uri = service.resolve_storage_uri(temp_dir.path()).unwrap();
            let expected = temp_dir
                .path()
                .join("custom/menu.lance")
                .to_string_lossy()
                .to_string();
            assert_eq!(uri, expected);
        });
    }

    #[test]
    fn figment_layers_file_and_environment() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "hidu.toml",
                r#"
                [server]
                port = 5000
                cors_origin = "https://hidu.example"

                [storage]
                uri = "mongodb://db:27017"
                "#,
            )?;
            jail.set_env("PORT", "6000");
            jail.set_env("HIDU_STORAGE__COLLECTION", "drinks");

            let config = AppConfig::load(Some(Path::new("hidu.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.server.port, 6000);
            assert_eq!(config.server.cors_origin, "https://hidu.example");
            assert_eq!(config.storage.uri.as_deref(), Some("mongodb://db:27017"));
            assert_eq!(config.storage.collection, "drinks");
            assert_eq!(config.storage.database, "hidu");
            Ok(())
        });
    }

    #[test]
    fn hidu_prefix_wins_over_legacy_variables() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MONGODB_URI", "mongodb://legacy:27017");
            jail.set_env("HIDU_STORAGE__URI", "mongodb://current:27017");

            let config =
                AppConfig::load(None).map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.storage_uri(), "mongodb://current:27017");
            Ok(())
        });
    }

    #[test]
    fn storage_uri_falls_back_to_local_store() {
        assert_eq!(AppConfig::default().storage_uri(), DEFAULT_LOCAL_STORE);
    }
}
