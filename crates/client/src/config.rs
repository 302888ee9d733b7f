//! Session handle configuration.

use std::time::Duration;

/// Configuration for [`crate::AuthHandle`].
#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// External auth microservice base URL
    pub auth_url: String,
    /// Session bridge base URL
    pub bridge_url: String,
    /// How often the background task revalidates the session
    pub revalidate_interval: Duration,
    /// Refresh when less than this remains before expiry
    pub refresh_window: Duration,
    /// HTTP timeout for both services
    pub request_timeout: Duration,
}

impl Default for AuthClientConfig {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            bridge_url: "http://localhost:8080".to_string(),
            revalidate_interval: Duration::from_secs(30 * 60),
            refresh_window: Duration::from_secs(15 * 60),
            request_timeout: Duration::from_secs(10),
        }
    }
}
