use serde::Deserialize;

#[derive(Default, Clone, Deserialize, Debug)]
pub struct BrokerConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Clone, Deserialize, Debug)]
pub struct RedisConfig {
    #[serde(default = "RedisConfig::default_urls")]
    pub urls: Vec<String>,
}

impl RedisConfig {
    fn default_urls() -> Vec<String> {
        vec!["redis://localhost:6379".to_string()]
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: Self::default_urls(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct ObjectStoreConfig {
    #[serde(default = "ObjectStoreConfig::default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores such as MinIO.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Path-style URLs (`endpoint/bucket/key`); required for MinIO.
    #[serde(default)]
    pub force_path_style: bool,
}

impl ObjectStoreConfig {
    fn default_region() -> String {
        "us-east-1".to_string()
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "SessionConfig::default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,
    #[serde(default = "SessionConfig::default_event_topic")]
    pub event_topic: String,
}

impl SessionConfig {
    fn default_ttl_secs() -> u64 {
        60 * 60
    }
    fn default_presign_ttl_secs() -> u64 {
        5 * 60
    }
    fn default_event_topic() -> String {
        "upload-session-events".to_string()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            presign_ttl_secs: Self::default_presign_ttl_secs(),
            event_topic: Self::default_event_topic(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct SweepConfig {
    #[serde(default = "SweepConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "SweepConfig::default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "SweepConfig::default_lock_hold_secs")]
    pub lock_hold_secs: u64,
}

impl SweepConfig {
    fn default_interval_secs() -> u64 {
        60
    }
    fn default_batch_size() -> usize {
        100
    }
    fn default_lock_hold_secs() -> u64 {
        30
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            batch_size: Self::default_batch_size(),
            lock_hold_secs: Self::default_lock_hold_secs(),
        }
    }
}

pub fn build_config() -> anyhow::Result<BrokerConfig> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = config::Config::builder().add_source(
        config::File::with_name("config")
            .required(false)
            .format(config::FileFormat::Yaml),
    );
    for arg in args {
        if arg.ends_with("yaml") || arg.ends_with("yml") {
            config = config.add_source(
                config::File::from(std::path::Path::new(arg.as_str()))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
    }
    config = config.add_source(
        config::Environment::with_prefix("BROKER")
            .separator("__")
            .try_parsing(true)
            .list_separator(";")
            .with_list_parse_key("redis.urls"),
    );
    Ok(config.build()?.try_deserialize()?)
}
