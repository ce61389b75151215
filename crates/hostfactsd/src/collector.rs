//! Collector client.
//!
//! Ships discovery payloads and heartbeats to the central collector over
//! HTTP, optionally with mTLS.

use reqwest::Url;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CollectorConfig;

/// Agent ids are UUIDv5 of the machine id under this namespace.
pub const AGENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0xfb92284e_aa5e_47f6_a883_bf9469e7a0dc);

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("could not read machine id from {path}: {source}")]
    MachineId {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {what} {path}: {source}")]
    TlsFile {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mTLS is enabled but the {0} path is not configured")]
    TlsNotConfigured(&'static str),

    #[error("invalid collector url: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector answered {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },
}

/// Derive the agent id from a machine id.
pub fn agent_id(machine_id: &str) -> Uuid {
    Uuid::new_v5(&AGENT_ID_NAMESPACE, machine_id.trim().as_bytes())
}

/// Read the machine id file and derive the agent id from it.
pub fn read_agent_id(machine_id_path: &Path) -> Result<Uuid, CollectorError> {
    let machine_id = fs::read_to_string(machine_id_path).map_err(|source| CollectorError::MachineId {
        path: machine_id_path.to_path_buf(),
        source,
    })?;
    Ok(agent_id(&machine_id))
}

/// Body of a collect request.
#[derive(Debug, Serialize)]
pub struct CollectRequest<'a, T: Serialize> {
    pub agent_id: String,
    pub discovery_type: &'a str,
    pub payload: &'a T,
}

pub struct CollectorClient {
    client: reqwest::Client,
    server_url: Url,
    agent_id: Uuid,
    api_key: Option<String>,
    tls_enabled: bool,
}

impl CollectorClient {
    /// Build a client; with mTLS enabled the CA, cert and key are loaded now.
    pub fn new(config: &CollectorConfig, agent_id: Uuid) -> Result<Self, CollectorError> {
        let server_url = Url::parse(&config.server_url)
            .map_err(|e| CollectorError::InvalidUrl(format!("{}: {}", config.server_url, e)))?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls();

        if config.enable_mtls {
            let ca_pem = read_tls_file("CA certificate", config.ca.as_deref())?;
            let cert_pem = read_tls_file("client certificate", config.cert.as_deref())?;
            let key_pem = read_tls_file("client key", config.key.as_deref())?;

            let ca_cert = reqwest::Certificate::from_pem(&ca_pem)?;

            // Combine cert and key for reqwest identity
            let mut identity_pem = cert_pem;
            identity_pem.extend_from_slice(&key_pem);
            let identity = reqwest::Identity::from_pem(&identity_pem)?;

            builder = builder.add_root_certificate(ca_cert).identity(identity);
        }

        let client = builder.build()?;
        if config.enable_mtls {
            info!("mTLS collector client initialized");
        }

        Ok(Self {
            client,
            server_url,
            agent_id,
            api_key: config.api_key.clone(),
            tls_enabled: config.enable_mtls,
        })
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    /// `<server_url>/api/collect`
    pub fn collect_url(&self) -> Result<Url, CollectorError> {
        self.endpoint("api/collect")
    }

    /// `<server_url>/api/hosts/<agent_id>/heartbeat`
    pub fn heartbeat_url(&self) -> Result<Url, CollectorError> {
        self.endpoint(&format!("api/hosts/{}/heartbeat", self.agent_id))
    }

    /// Publish one discovery payload.
    pub async fn publish<T: Serialize>(
        &self,
        discovery_type: &str,
        payload: &T,
    ) -> Result<(), CollectorError> {
        let url = self.collect_url()?;
        let body = CollectRequest {
            agent_id: self.agent_id.to_string(),
            discovery_type,
            payload,
        };

        debug!("Publishing {} discovery to {}", discovery_type, url);
        let request = self.with_api_key(self.client.post(url.clone())).json(&body);
        let response = request.send().await?;
        check_status(response.status(), &url)?;

        info!("Published {} discovery", discovery_type);
        Ok(())
    }

    /// Tell the collector this agent is alive.
    pub async fn heartbeat(&self) -> Result<(), CollectorError> {
        let url = self.heartbeat_url()?;

        let response = self.with_api_key(self.client.post(url.clone())).send().await?;
        check_status(response.status(), &url)?;

        debug!("Heartbeat sent for agent {}", self.agent_id);
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, CollectorError> {
        let mut base = self.server_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| CollectorError::InvalidUrl(format!("{}{}: {}", base, path, e)))
    }

    fn with_api_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }
}

fn read_tls_file(what: &'static str, path: Option<&Path>) -> Result<Vec<u8>, CollectorError> {
    let path = path.ok_or(CollectorError::TlsNotConfigured(what))?;
    fs::read(path).map_err(|source| CollectorError::TlsFile {
        what,
        path: path.to_path_buf(),
        source,
    })
}

fn check_status(status: reqwest::StatusCode, url: &Url) -> Result<(), CollectorError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(CollectorError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
