//! HTTP connection pool and TLS setup shared by the session and all clients

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::ApiError;
use crate::config::Config;

pub struct ConnectionPoolConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub last_request: Option<Instant>,
}

/// Request counters kept per service client
#[derive(Clone, Default)]
pub struct RequestStats {
    stats: Arc<RwLock<ConnectionStats>>,
}

impl RequestStats {
    pub async fn record_request(&self, success: bool) {
        let mut stats = self.stats.write().await;
        stats.total_requests += 1;
        if !success {
            stats.failed_requests += 1;
        }
        stats.last_request = Some(Instant::now());
    }

    pub async fn get_stats(&self) -> ConnectionStats {
        self.stats.read().await.clone()
    }
}

/// Builds the single HTTP client the session and every service client share
pub struct ConnectionPoolManager {
    config: ConnectionPoolConfig,
}

/// PEM material may be given inline or as a path to a file
fn read_pem(value: &str, what: &str) -> Result<Vec<u8>, ApiError> {
    if value.contains("-----BEGIN") {
        return Ok(value.as_bytes().to_vec());
    }
    std::fs::read(Path::new(value))
        .map_err(|e| ApiError::Auth(format!("Error reading {} {}: {}", what, value, e)))
}

impl ConnectionPoolManager {
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self { config }
    }

    /// Build a client honoring `insecure`, `cacert_file` and `cert`/`key`
    pub fn build_client(&self, config: &Config) -> Result<reqwest::Client, ApiError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connection_timeout)
            .pool_idle_timeout(self.config.idle_timeout)
            .pool_max_idle_per_host(self.config.max_idle_connections);

        if let Some(keepalive) = self.config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        if let Some(cacert) = &config.cacert_file {
            let pem = read_pem(cacert, "CA certificate")?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ApiError::Auth(format!("Invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        match (&config.cert, &config.key) {
            (Some(cert), Some(key)) => {
                let mut pem = read_pem(cert, "client certificate")?;
                pem.push(b'\n');
                pem.extend(read_pem(key, "client key")?);
                let identity = reqwest::Identity::from_pem(&pem)
                    .map_err(|e| ApiError::Auth(format!("Invalid client certificate: {}", e)))?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(ApiError::Auth(
                    "Both cert and key must be provided for client authentication".to_string(),
                ))
            }
        }

        builder.build().map_err(ApiError::Request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ProviderConfig};

    fn config(explicit: ProviderConfig) -> Config {
        let env = Environment::from_pairs(&[("OS_AUTH_URL", "http://keystone:5000")]);
        Config::resolve(&explicit, &env, None).unwrap()
    }

    #[test]
    fn builds_default_client() {
        let pool = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        assert!(pool.build_client(&config(ProviderConfig::default())).is_ok());
    }

    #[test]
    fn missing_ca_file_is_an_auth_error() {
        let pool = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        let explicit = ProviderConfig {
            cacert_file: Some("/nonexistent/ca.pem".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            pool.build_client(&config(explicit)),
            Err(ApiError::Auth(_))
        ));
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let pool = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        let explicit = ProviderConfig {
            cert: Some("-----BEGIN CERTIFICATE-----".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            pool.build_client(&config(explicit)),
            Err(ApiError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn stats_count_failures() {
        let counters = RequestStats::default();
        counters.record_request(true).await;
        counters.record_request(false).await;

        let stats = counters.get_stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert!(stats.last_request.is_some());
    }
}
