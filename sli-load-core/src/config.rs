use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_SERVER: &str = "https://secure.gooddata.com";
pub const DEFAULT_UPLOAD_HOST: &str = "secure-di.gooddata.com";

/// Where the platform lives: REST server root and the staging FTP host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_upload_host")]
    pub upload_host: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_upload_host() -> String {
    DEFAULT_UPLOAD_HOST.to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            upload_host: default_upload_host(),
        }
    }
}

impl PlatformConfig {
    pub fn trace_loaded(&self) {
        info!(
            server = %self.server,
            upload_host = %self.upload_host,
            "Loaded platform config"
        );
        debug!(?self, "Platform config loaded (full debug)");
    }
}
