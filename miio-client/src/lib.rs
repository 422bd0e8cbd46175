//! Private miio client for local air-purifier communication
//!
//! This crate provides a minimal client for the encrypted UDP request/response
//! protocol spoken by miio devices. It performs the hello handshake, keeps the
//! device stamp in sync and exchanges JSON-RPC style calls.

mod error;
pub mod packet;

pub use error::MiioError;
pub use packet::Token;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// UDP port miio devices listen on
pub const DEFAULT_PORT: u16 = 54321;

/// Default time to wait for a reply
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_PACKET: usize = 4096;

/// A handshaken connection to one miio device
///
/// Calls are not multiplexed: callers must not issue overlapping `call`s on
/// the same client. Replies to stale request ids are skipped.
#[derive(Debug)]
pub struct MiioClient {
    socket: UdpSocket,
    token: Token,
    device_id: u32,
    stamp: u32,
    handshake_at: Instant,
    next_id: AtomicU64,
    timeout: Duration,
}

impl MiioClient {
    /// Open a socket to `addr` and perform the hello handshake
    pub async fn connect(
        addr: SocketAddr,
        token: Token,
        timeout: Duration,
    ) -> Result<Self, MiioError> {
        let bind_addr: SocketAddr = if addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;

        socket.send(&packet::hello_packet()).await?;

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; MAX_PACKET];
        let header = loop {
            let len = timeout_at(deadline, socket.recv(&mut buf))
                .await
                .map_err(|_| MiioError::Timeout(timeout))??;
            match packet::parse_header(&buf[..len]) {
                Ok(header) => break header,
                Err(e) => debug!(%addr, error = %e, "Ignoring malformed handshake reply"),
            }
        };

        debug!(
            %addr,
            device_id = header.device_id,
            stamp = header.stamp,
            "miio handshake complete"
        );

        Ok(Self {
            socket,
            token,
            device_id: header.device_id,
            stamp: header.stamp,
            handshake_at: Instant::now(),
            next_id: AtomicU64::new(1),
            timeout,
        })
    }

    /// Device id reported during the handshake
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Send `method` with positional `params` and return the `result` value
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, MiioError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({ "id": id, "method": method, "params": params });
        let payload = serde_json::to_vec(&request)
            .map_err(|e| MiioError::Protocol(e.to_string()))?;

        let packet = packet::encode(&self.token, self.device_id, self.current_stamp(), &payload);
        trace!(id, method, "Sending miio request");
        self.socket.send(&packet).await?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_PACKET];
        loop {
            let len = timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .map_err(|_| MiioError::Timeout(self.timeout))??;

            let reply = match packet::decode(&self.token, &buf[..len]) {
                Ok(reply) if !reply.payload.is_empty() => reply,
                Ok(_) => continue,
                Err(e) => {
                    debug!(id, error = %e, "Skipping undecodable packet");
                    continue;
                }
            };

            let body: Value = match serde_json::from_slice(&reply.payload) {
                Ok(body) => body,
                Err(e) => {
                    debug!(id, error = %e, "Skipping reply with invalid JSON");
                    continue;
                }
            };

            if body.get("id").and_then(Value::as_u64) != Some(id) {
                debug!(id, "Skipping reply for a different request");
                continue;
            }

            return extract_result(body);
        }
    }

    fn current_stamp(&self) -> u32 {
        let elapsed = self.handshake_at.elapsed().as_secs() as u32;
        self.stamp.wrapping_add(elapsed)
    }
}

fn extract_result(mut body: Value) -> Result<Value, MiioError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(MiioError::Remote { code, message });
    }

    body.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| MiioError::Protocol("reply has neither result nor error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_result_returns_result_value() {
        let body = json!({ "id": 1, "result": ["ok"] });
        assert_eq!(extract_result(body).unwrap(), json!(["ok"]));
    }

    #[test]
    fn test_extract_result_maps_error_object() {
        let body = json!({ "id": 1, "error": { "code": -32601, "message": "Method not found." } });
        match extract_result(body) {
            Err(MiioError::Remote { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found.");
            }
            other => panic!("Expected MiioError::Remote, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_result_missing_both() {
        let body = json!({ "id": 1 });
        assert!(matches!(extract_result(body), Err(MiioError::Protocol(_))));
    }

    #[test]
    fn test_error_without_code_defaults() {
        let body = json!({ "id": 1, "error": {} });
        match extract_result(body) {
            Err(MiioError::Remote { code, message }) => {
                assert_eq!(code, -1);
                assert_eq!(message, "unknown error");
            }
            other => panic!("Expected MiioError::Remote, got {:?}", other),
        }
    }
}
