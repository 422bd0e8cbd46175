//! Device sessions and the transport seam
//!
//! A [`DeviceSession`] wraps one live transport handle. It never retries and
//! never reconnects on its own: transport failures are reported to a
//! [`FailureSink`] (the connection manager) before the error is returned,
//! so the reconnect is already scheduled by the time a caller sees it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use miio_client::{MiioClient, Token};
use purifier_api::{is_acknowledged, ApiError, CommandCandidate, DeviceConfig, RemoteError};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Request/response channel to one device
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one command and return the raw `result` value
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError>;
}

/// Opens transports for a device configuration
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &DeviceConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn Transport>, ApiError>;
}

/// Receives transport failures from sessions
pub trait FailureSink: Send + Sync {
    fn report_failure(&self, generation: u64);
}

/// [`Transport`] over the encrypted miio UDP protocol
pub struct MiioTransport {
    client: MiioClient,
}

#[async_trait]
impl Transport for MiioTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError> {
        Ok(self.client.call(method, params).await?)
    }
}

/// Default [`Connector`]: handshakes with the device over miio
#[derive(Debug, Default, Clone, Copy)]
pub struct MiioConnector;

#[async_trait]
impl Connector for MiioConnector {
    async fn connect(
        &self,
        config: &DeviceConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn Transport>, ApiError> {
        let addr = config
            .socket_addr()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let token: Token = config.token.parse()?;
        let client = MiioClient::connect(addr, token, timeout).await?;
        debug!(device = %config.name, %addr, device_id = client.device_id(), "Opened miio transport");
        Ok(Arc::new(MiioTransport { client }))
    }
}

/// One live session with a device
///
/// Calls are serialized: at most one request is in flight per session.
pub struct DeviceSession {
    generation: u64,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<()>,
    failures: Weak<dyn FailureSink>,
}

impl DeviceSession {
    pub fn new(generation: u64, transport: Arc<dyn Transport>, failures: Weak<dyn FailureSink>) -> Self {
        Self {
            generation,
            transport,
            in_flight: Mutex::new(()),
            failures,
        }
    }

    /// Connection attempt that produced this session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send a command and return the raw result
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError> {
        let result = {
            let _guard = self.in_flight.lock().await;
            trace!(method, generation = self.generation, "Calling device");
            self.transport.call(method, params).await
        };

        if let Err(e) = &result {
            debug!(method, generation = self.generation, error = %e, "Device call failed");
            if e.is_transport() {
                if let Some(sink) = self.failures.upgrade() {
                    sink.report_failure(self.generation);
                }
            }
        }
        result
    }

    /// Run a write candidate, requiring an explicit success acknowledgement
    pub async fn execute(&self, candidate: &CommandCandidate) -> Result<Value, ApiError> {
        let reply = self.call(candidate.method, candidate.params.clone()).await?;
        if is_acknowledged(&reply) {
            Ok(reply)
        } else {
            Err(ApiError::Remote(RemoteError::unacknowledged(&reply)))
        }
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
