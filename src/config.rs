//! Gateway configuration.

use std::time::Duration;

use anyhow::bail;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the OpenAI-style completion endpoint.
    pub upstream_url: String,
    /// Bearer key for the upstream endpoint; empty disables the header.
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Connection/setup deadline for the upstream request.
    pub request_timeout: Duration,
    /// Maximum quiet time between upstream chunks before the relay gives up
    /// on the stream.
    pub idle_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            request_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream_url.trim().is_empty() {
            bail!("upstream_url must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature must be within 0.0..=2.0, got {}", self.temperature);
        }
        if self.idle_timeout.is_zero() {
            bail!("idle_timeout must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        GatewayConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = GatewayConfig {
            temperature: 3.5,
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_upstream_url_is_rejected() {
        let config = GatewayConfig {
            upstream_url: "  ".to_string(),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
