//! Manifest and artifact transport.
//!
//! Production traffic goes over HTTP(S) with a single pinned certificate
//! authority: the platform trust store is never consulted, so only servers
//! presenting a chain to the pinned CA are accepted.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{DaemonError, UpdateErrorKind};

use super::manifest::UpdateManifest;

/// Certificate authority trusted for update traffic.
pub const PINNED_CA_PEM: &str = include_str!("../../certs/update_ca.pem");

/// Something that can serve update manifests and artifact bytes.
pub trait UpdateSource: Send + Sync {
    /// Fetch and parse the manifest at `url`.
    fn fetch_manifest(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<UpdateManifest, DaemonError>> + Send;

    /// Download the full body at `url`.
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DaemonError>> + Send;
}

/// reqwest-backed source trusting only the pinned CA.
#[derive(Debug, Clone)]
pub struct HttpUpdateSource {
    client: reqwest::Client,
    header_timeout: Duration,
}

impl HttpUpdateSource {
    /// Build a source from settings, reading `ca_cert_path` if configured.
    pub fn from_config(config: &HttpConfig) -> Result<Self, DaemonError> {
        match &config.ca_cert_path {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| DaemonError::Config {
                    message: format!("Failed to read CA bundle '{}': {}", path.display(), e),
                })?;
                Self::with_ca_pem(&pem, config)
            }
            None => Self::with_ca_pem(PINNED_CA_PEM.as_bytes(), config),
        }
    }

    /// Build a source trusting exactly the certificates in `pem`.
    pub fn with_ca_pem(pem: &[u8], config: &HttpConfig) -> Result<Self, DaemonError> {
        let certificates = reqwest::Certificate::from_pem_bundle(pem).map_err(|e| {
            DaemonError::Config {
                message: format!("Can not get root CA: {}", e),
            }
        })?;
        if certificates.is_empty() {
            return Err(DaemonError::Config {
                message: "Can not get root CA: no certificate in bundle".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());
        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }
        let client = builder.build().map_err(|e| DaemonError::Config {
            message: format!("Failed to build HTTP client: {}", error_chain(&e)),
        })?;

        Ok(Self {
            client,
            header_timeout: config.response_header_timeout(),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = tokio::time::timeout(self.header_timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                format!(
                    "no response headers within {}s",
                    self.header_timeout.as_secs()
                )
            })?
            .map_err(|e| error_chain(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server answered {}", status));
        }

        let body = response.bytes().await.map_err(|e| error_chain(&e))?;
        debug!(url, bytes = body.len(), "Fetched");
        Ok(body.to_vec())
    }
}

impl UpdateSource for HttpUpdateSource {
    async fn fetch_manifest(&self, url: &str) -> Result<UpdateManifest, DaemonError> {
        let body = self.get(url).await.map_err(|message| {
            DaemonError::update(UpdateErrorKind::ManifestFetch {
                url: url.to_string(),
                message,
            })
        })?;
        UpdateManifest::parse(url, &body)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DaemonError> {
        self.get(url).await.map_err(|message| {
            DaemonError::update(UpdateErrorKind::ManifestFetch {
                url: url.to_string(),
                message,
            })
        })
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
