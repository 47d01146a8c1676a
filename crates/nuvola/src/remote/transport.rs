//! HTTPS transport backed by ureq
//!
//! Uses synchronous HTTP (ureq) to keep the client executor-agnostic.

use std::time::Duration;

use url::Url;

use super::{Credential, Reply, Transport};
use crate::error::{Error, Result};

/// Transport sending requests to one base URL
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: Url,
}

impl UreqTransport {
    /// Create a transport for the given base URL (e.g. `https://nuvola.madisoft.it`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Http(format!("invalid base URL '{}': {}", base_url, e)))?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();

        Ok(Self { agent, base_url })
    }

    /// Resolve an absolute API path against the base URL
    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Http(format!("invalid request path '{}': {}", path, e)))
    }
}

impl Transport for UreqTransport {
    fn get(&self, path: &str, credential: &Credential) -> Result<Reply> {
        let url = self.url_for(path)?;
        let request = self.agent.get(url.as_str());
        let request = match credential {
            Credential::Bearer(token) => {
                request.header("Authorization", &format!("Bearer {}", token))
            }
            Credential::Cookie { name, value } => {
                request.header("Cookie", &format!("{}={}", name, value))
            }
        };

        let mut response = request.call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok(Reply { status, body })
    }
}
