use reqwest::blocking::{Client, ClientBuilder};
use std::time::Duration;

/// Create the default HTTP client for Pos web service requests
/// with optimized settings for connection pooling.
///
/// Read timeouts are resolved per request by the dispatcher, so the
/// client itself only bounds connection establishment.
pub fn create_pos_client() -> Client {
    ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// Configuration for a Pos web service client
#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the service API, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Authentication key sent with every request
    pub api_key: String,
    /// Ask the service for debug output and log request timing
    pub debug: bool,
    /// Log outgoing request lines to stderr (no bodies)
    pub verbose: bool,
}

impl Config {
    /// Create a new configuration with the given base URL and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Config {
            base_url: base_url.into(),
            api_key: api_key.into(),
            debug: false,
            verbose: false,
        }
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set verbose request logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Endpoint for a resource URI, tolerating a trailing slash on the base
    pub fn endpoint(&self, uri: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, uri)
        } else {
            format!("{}/{}", self.base_url, uri)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_slash() {
        let config = Config::new("http://localhost:8000/api", "key");
        assert_eq!(config.endpoint("product"), "http://localhost:8000/api/product");
    }

    #[test]
    fn test_endpoint_keeps_single_slash() {
        let config = Config::new("http://localhost:8000/api/", "key");
        assert_eq!(config.endpoint("product"), "http://localhost:8000/api/product");
    }

    #[test]
    fn test_config_flags() {
        let config = Config::new("http://localhost:8000/api", "key")
            .with_debug(true)
            .with_verbose(true);
        assert!(config.debug);
        assert!(config.verbose);
    }
}
