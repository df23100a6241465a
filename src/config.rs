use std::env;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8500;

/// Where a server process stores generated media and how it links to it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_url: String,
    pub root_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            service_url: derive_service_url(DEFAULT_HOST, DEFAULT_PORT),
            root_dir: PathBuf::from("."),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `SERVICE_URL`, falling back to a URL built from `host` and `port`.
    /// The root directory is the current working directory.
    pub fn from_env(host: &str, port: u16) -> Self {
        Self::resolve(env::var("SERVICE_URL").ok().as_deref(), host, port)
    }

    /// Like [`ServiceConfig::from_env`] with the `SERVICE_URL` value passed in.
    pub fn resolve(service_url: Option<&str>, host: &str, port: u16) -> Self {
        let service_url = match service_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => derive_service_url(host, port),
        };
        let root_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        ServiceConfig {
            service_url,
            root_dir,
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root_dir.join("images")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root_dir.join("videos")
    }
}

/// Wildcard bind addresses are not routable, so links point at loopback instead.
pub fn derive_service_url(host: &str, port: u16) -> String {
    let url_host = match host {
        "0.0.0.0" | "::" => "127.0.0.1".to_string(),
        h if h.contains(':') && !h.starts_with('[') => format!("[{}]", h),
        h => h.to_string(),
    };
    format!("http://{}:{}", url_host, port)
}

/// Connection settings used by the drivers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            api_key: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, host: &str, port: u16) -> Self {
        self.base_url = format!("http://{}:{}", host, port);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_hosts_map_to_loopback() {
        assert_eq!(derive_service_url("0.0.0.0", 8500), "http://127.0.0.1:8500");
        assert_eq!(derive_service_url("::", 9000), "http://127.0.0.1:9000");
        assert_eq!(derive_service_url("gpu-box", 8500), "http://gpu-box:8500");
        assert_eq!(derive_service_url("fe80::1", 80), "http://[fe80::1]:80");
    }

    #[test]
    fn test_service_config_dirs() {
        let config = ServiceConfig::new()
            .with_root_dir("/srv/diffusers")
            .with_service_url("http://example.com/");
        assert_eq!(config.service_url, "http://example.com");
        assert_eq!(config.image_dir(), PathBuf::from("/srv/diffusers/images"));
        assert_eq!(config.video_dir(), PathBuf::from("/srv/diffusers/videos"));
    }

    #[test]
    fn test_service_url_resolution() {
        let config = ServiceConfig::resolve(Some("https://gen.example.org/"), "0.0.0.0", 8500);
        assert_eq!(config.service_url, "https://gen.example.org");

        let config = ServiceConfig::resolve(Some(""), "0.0.0.0", 8600);
        assert_eq!(config.service_url, "http://127.0.0.1:8600");

        let config = ServiceConfig::resolve(None, "gpu-box", 8500);
        assert_eq!(config.service_url, "http://gpu-box:8500");
        assert_eq!(config.root_dir, env::current_dir().unwrap());
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new().with_address("localhost", 8600);
        assert_eq!(config.base_url, "http://localhost:8600");
        assert!(config.api_key.is_none());

        let config = config.with_base_url("http://10.0.0.2:8500/").with_api_key("k");
        assert_eq!(config.base_url, "http://10.0.0.2:8500");
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }
}
