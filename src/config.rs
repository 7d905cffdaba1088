//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main estimator configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EstimatorConfig {
    pub api_port: u16,
    pub model: ModelSettings,
    pub store: StoreConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model: ModelSettings::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Where the trained artifact lives and how predictions are shaped
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub bucket: String,
    pub key: String,

    /// Label domain for demo-mode predictions
    pub cluster_count: usize,

    /// Local directory downloaded artifacts are written to
    pub cache_dir: PathBuf,

    /// The only directory `POST /model/save` may upload from
    pub staging_dir: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            key: default_model_key(),
            cluster_count: default_cluster_count(),
            cache_dir: default_cache_dir(),
            staging_dir: default_staging_dir(),
        }
    }
}

/// Remote artifact store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    S3,
    Local,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "local" => Ok(Self::Local),
            other => anyhow::bail!("Unknown store backend '{}' (expected s3 or local)", other),
        }
    }
}

/// Remote artifact store connection settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub region: String,

    /// Custom S3-compatible endpoint (MinIO, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Root directory for the local backend; each bucket is a subdirectory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,

    /// Upper bound on every remote call
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::S3,
            region: default_region(),
            endpoint: None,
            local_root: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EstimatorConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(port) = std::env::var("CLUSTER_ESTIMATOR_API_PORT") {
            config.api_port = port
                .parse()
                .context("Invalid CLUSTER_ESTIMATOR_API_PORT value")?;
        }
        if let Ok(bucket) = std::env::var("CLUSTER_ESTIMATOR_BUCKET") {
            config.model.bucket = bucket;
        }
        if let Ok(key) = std::env::var("CLUSTER_ESTIMATOR_MODEL_KEY") {
            config.model.key = key;
        }
        if let Ok(clusters) = std::env::var("CLUSTER_ESTIMATOR_CLUSTERS") {
            config.model.cluster_count = clusters
                .parse()
                .context("Invalid CLUSTER_ESTIMATOR_CLUSTERS value")?;
        }
        if let Ok(staging) = std::env::var("CLUSTER_ESTIMATOR_STAGING_DIR") {
            config.model.staging_dir = PathBuf::from(staging);
        }
        if let Ok(backend) = std::env::var("CLUSTER_ESTIMATOR_STORE") {
            config.store.backend = backend.parse()?;
        }
        if let Ok(root) = std::env::var("CLUSTER_ESTIMATOR_LOCAL_ROOT") {
            config.store.local_root = Some(PathBuf::from(root));
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            config.store.region = region;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_port < 1024 {
            anyhow::bail!("API port must be >= 1024 (got {})", self.api_port);
        }

        if self.model.bucket.trim().is_empty() {
            anyhow::bail!("Model bucket cannot be empty");
        }
        if self.model.key.trim().is_empty() {
            anyhow::bail!("Model key cannot be empty");
        }
        if self.model.cluster_count == 0 {
            anyhow::bail!("cluster_count must be at least 1");
        }

        if self.store.timeout_secs == 0 {
            anyhow::bail!("Store timeout must be greater than zero");
        }
        if self.store.backend == StoreBackend::Local && self.store.local_root.is_none() {
            anyhow::bail!("The local store backend requires store.local_root");
        }

        Ok(())
    }
}

// Default functions
fn default_api_port() -> u16 {
    8000
}
fn default_bucket() -> String {
    "customer-segmentation-models".to_string()
}
fn default_model_key() -> String {
    "model/model.json".to_string()
}
fn default_cluster_count() -> usize {
    3
}
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("cluster-estimator"))
        .unwrap_or_else(|| PathBuf::from("/tmp/cluster-estimator"))
}
fn default_staging_dir() -> PathBuf {
    default_cache_dir().join("staging")
}
fn default_region() -> String {
    "ap-south-1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = EstimatorConfig::default();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.model.cluster_count, 3);
        assert_eq!(config.model.key, "model/model.json");
        assert!(config.model.staging_dir.ends_with("cluster-estimator/staging"));
        assert_eq!(config.store.backend, StoreBackend::S3);
        assert_eq!(config.store.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_validation() {
        let config = EstimatorConfig {
            api_port: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let mut config = EstimatorConfig::default();
        config.model.cluster_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut config = EstimatorConfig::default();
        config.model.key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_backend_requires_root() {
        let mut config = EstimatorConfig::default();
        config.store.backend = StoreBackend::Local;
        assert!(config.validate().is_err());

        config.store.local_root = Some(PathBuf::from("/srv/artifacts"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EstimatorConfig = toml::from_str(
            r#"
            [model]
            bucket = "segments"

            [store]
            backend = "local"
            local_root = "/srv/artifacts"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.bucket, "segments");
        assert_eq!(config.model.key, "model/model.json");
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.store.region, "ap-south-1");
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("S3".parse::<StoreBackend>().unwrap(), StoreBackend::S3);
        assert_eq!("local".parse::<StoreBackend>().unwrap(), StoreBackend::Local);
        assert!("gcs".parse::<StoreBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var("CLUSTER_ESTIMATOR_BUCKET", "env-bucket");
            std::env::set_var("CLUSTER_ESTIMATOR_CLUSTERS", "5");
            std::env::set_var("CLUSTER_ESTIMATOR_STAGING_DIR", "/srv/staging");
        }

        let config = EstimatorConfig::load(None).unwrap();

        unsafe {
            std::env::remove_var("CLUSTER_ESTIMATOR_BUCKET");
            std::env::remove_var("CLUSTER_ESTIMATOR_CLUSTERS");
            std::env::remove_var("CLUSTER_ESTIMATOR_STAGING_DIR");
        }

        assert_eq!(config.model.bucket, "env-bucket");
        assert_eq!(config.model.cluster_count, 5);
        assert_eq!(config.model.staging_dir, PathBuf::from("/srv/staging"));
    }

    #[test]
    #[serial]
    fn test_invalid_env_override() {
        unsafe {
            std::env::set_var("CLUSTER_ESTIMATOR_CLUSTERS", "many");
        }
        let result = EstimatorConfig::load(None);
        unsafe {
            std::env::remove_var("CLUSTER_ESTIMATOR_CLUSTERS");
        }
        assert!(result.is_err());
    }
}
