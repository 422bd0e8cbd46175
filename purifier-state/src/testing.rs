//! Scripted in-memory device for driving the engine without a network
//!
//! Available in this crate's tests and, for downstream crates, behind the
//! `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use purifier_api::error::METHOD_NOT_FOUND;
use purifier_api::{ApiError, DeviceConfig, RemoteError};
use serde_json::Value;

use crate::session::{Connector, Transport};

type Reply = Result<Value, ApiError>;

/// A call the scripted device received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct Script {
    connect_failures: usize,
    connect_attempts: usize,
    queued: HashMap<String, VecDeque<Reply>>,
    standing: HashMap<String, Reply>,
    calls: Vec<RecordedCall>,
}

/// A fake purifier whose replies are scripted per method
///
/// Replies queued with [`ScriptedDevice::respond_once`] are consumed first,
/// then the standing reply from [`ScriptedDevice::respond`] is used. Methods
/// with neither answer "method not found".
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connection attempts
    pub fn fail_connects(&self, count: usize) {
        self.script.lock().connect_failures = count;
    }

    pub fn respond(&self, method: &str, reply: Reply) {
        self.script.lock().standing.insert(method.to_string(), reply);
    }

    pub fn respond_once(&self, method: &str, reply: Reply) {
        self.script
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    /// Methods called so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.script
            .lock()
            .calls
            .iter()
            .map(|call| call.method.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }

    pub fn connect_attempts(&self) -> usize {
        self.script.lock().connect_attempts
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    fn answer(&self, method: &str, params: Vec<Value>) -> Reply {
        let mut script = self.script.lock();
        script.calls.push(RecordedCall {
            method: method.to_string(),
            params,
        });

        if let Some(reply) = script.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return reply;
        }
        script
            .standing
            .get(method)
            .cloned()
            .unwrap_or_else(unsupported)
    }
}

#[async_trait]
impl Connector for ScriptedDevice {
    async fn connect(
        &self,
        _config: &DeviceConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn Transport>, ApiError> {
        let mut script = self.script.lock();
        script.connect_attempts += 1;
        if script.connect_failures > 0 {
            script.connect_failures -= 1;
            return Err(ApiError::Transport("scripted connect failure".to_string()));
        }
        Ok(Arc::new(ScriptedTransport {
            device: self.clone(),
        }))
    }
}

struct ScriptedTransport {
    device: ScriptedDevice,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError> {
        self.device.answer(method, params)
    }
}

/// The firmware does not know the command
pub fn unsupported() -> Reply {
    Err(ApiError::Remote(RemoteError::from_code(
        METHOD_NOT_FOUND,
        "Method not found.",
    )))
}

/// The firmware refused the command
pub fn rejected() -> Reply {
    Err(ApiError::Remote(RemoteError::from_code(-5001, "invalid_arg")))
}

pub fn transport_error() -> Reply {
    Err(ApiError::Transport("scripted timeout".to_string()))
}

pub fn ok() -> Reply {
    Ok(Value::Array(vec![Value::from("ok")]))
}
