use crate::decoders::Charset;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub text: TextConfig,
}

/// Response dispatch queue settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
        }
    }
}

fn default_label() -> String {
    "fetchtask.responses".to_string()
}

/// How a response body is handed over: in memory or as a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Data,
    File,
    /// File when the declared length exceeds `max_in_memory_bytes`
    #[default]
    Auto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub mode: TransferMode,
    #[serde(default = "default_max_in_memory_bytes")]
    pub max_in_memory_bytes: ByteSize,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::default(),
            max_in_memory_bytes: default_max_in_memory_bytes(),
            download_dir: default_download_dir(),
        }
    }
}

fn default_max_in_memory_bytes() -> ByteSize {
    ByteSize(8 * 1024 * 1024) // 8 MB
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("fetchtask")
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` from the environment
    #[serde(default = "default_system_proxy")]
    pub system_proxy: bool,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            system_proxy: default_system_proxy(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("fetchtask/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_system_proxy() -> bool {
    true
}

/// Text decoding settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextConfig {
    /// Used when the response does not declare a supported charset
    #[serde(default)]
    pub default_charset: Charset,
}
