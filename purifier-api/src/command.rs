//! Control intents and the command resolver
//!
//! An intent is a validated, abstract control request. [`resolve`] turns it
//! into an ordered list of concrete device commands for a given model, and
//! [`FallbackChain`] walks that list one outcome at a time.

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

use crate::codec::{encode_switch, percent_to_level};
use crate::error::ApiError;
use crate::model::{LightControl, Model};
use crate::property::Mode;

/// Validation error for intent values and property names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Parameter '{parameter}' value '{value}' is out of range ({min}..={max})")]
    RangeError {
        parameter: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Parameter '{parameter}' value '{value}' is invalid: {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("Unknown intent '{0}'")]
    UnknownIntent(String),

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),
}

impl ValidationError {
    pub fn range_error(
        parameter: &str,
        min: impl fmt::Display,
        max: impl fmt::Display,
        value: impl fmt::Display,
    ) -> Self {
        Self::RangeError {
            parameter: parameter.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid_value(parameter: &str, value: impl fmt::Display) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: "invalid format or content".to_string(),
        }
    }
}

/// A validated control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlIntent {
    Power(bool),
    Mode(Mode),
    /// Target speed in percent, `0..=100`
    RotationSpeed(u8),
    Light(bool),
    Buzzer(bool),
    ChildLock(bool),
}

impl ControlIntent {
    pub const NAMES: [&'static str; 6] =
        ["power", "mode", "rotation_speed", "light", "buzzer", "child_lock"];

    /// Validate a named intent and its value
    pub fn parse(name: &str, value: &Value) -> Result<Self, ValidationError> {
        match name {
            "power" => bool_value(name, value).map(ControlIntent::Power),
            "light" => bool_value(name, value).map(ControlIntent::Light),
            "buzzer" => bool_value(name, value).map(ControlIntent::Buzzer),
            "child_lock" => bool_value(name, value).map(ControlIntent::ChildLock),
            "mode" => match value.as_str().and_then(Mode::parse) {
                Some(mode) if mode != Mode::Idle => Ok(ControlIntent::Mode(mode)),
                _ => Err(ValidationError::InvalidValue {
                    parameter: name.to_string(),
                    value: value.to_string(),
                    reason: "expected one of auto, favorite, silent".to_string(),
                }),
            },
            "rotation_speed" => {
                let speed = value
                    .as_f64()
                    .ok_or_else(|| ValidationError::invalid_value(name, value))?;
                if !(0.0..=100.0).contains(&speed) {
                    return Err(ValidationError::range_error(name, 0, 100, value));
                }
                Ok(ControlIntent::RotationSpeed(speed.round() as u8))
            }
            other => Err(ValidationError::UnknownIntent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlIntent::Power(_) => "power",
            ControlIntent::Mode(_) => "mode",
            ControlIntent::RotationSpeed(_) => "rotation_speed",
            ControlIntent::Light(_) => "light",
            ControlIntent::Buzzer(_) => "buzzer",
            ControlIntent::ChildLock(_) => "child_lock",
        }
    }
}

fn bool_value(name: &str, value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| ValidationError::invalid_value(name, value))
}

/// One concrete device command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCandidate {
    pub method: &'static str,
    pub params: Vec<Value>,
}

impl CommandCandidate {
    pub fn new(method: &'static str, params: Vec<Value>) -> Self {
        Self { method, params }
    }
}

impl fmt::Display for CommandCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.method, Value::Array(self.params.clone()))
    }
}

/// The resolved form of an intent
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPlan {
    /// Mode the device must be in before the candidates are tried
    pub required_mode: Option<Mode>,
    /// Fallback chain, highest priority first
    pub candidates: Vec<CommandCandidate>,
}

/// The command that switches the device into `mode`
pub fn mode_switch(mode: Mode) -> CommandCandidate {
    CommandCandidate::new("set_mode", vec![json!(mode.as_str())])
}

/// Resolve an intent into its ordered command candidates for `model`
pub fn resolve(intent: &ControlIntent, model: Model) -> CommandPlan {
    let single = |candidate: CommandCandidate| CommandPlan {
        required_mode: None,
        candidates: vec![candidate],
    };

    match *intent {
        ControlIntent::Power(on) => {
            single(CommandCandidate::new("set_power", vec![json!(encode_switch(on))]))
        }
        ControlIntent::Mode(mode) => single(mode_switch(mode)),
        ControlIntent::RotationSpeed(percent) => {
            let level = json!(percent_to_level(percent, model.favorite_level_max()));
            CommandPlan {
                required_mode: Some(Mode::Favorite),
                candidates: vec![
                    CommandCandidate::new("set_level_favorite", vec![level.clone()]),
                    CommandCandidate::new("set_favorite_level", vec![level.clone()]),
                    CommandCandidate::new("set_speed_level", vec![level]),
                ],
            }
        }
        ControlIntent::Light(on) => match model.light_control() {
            LightControl::TriState => {
                let brightness = if on { LedBrightness::Bright } else { LedBrightness::Off };
                single(CommandCandidate::new("set_led_b", vec![json!(brightness as u8)]))
            }
            LightControl::Switch => {
                single(CommandCandidate::new("set_led", vec![json!(encode_switch(on))]))
            }
        },
        ControlIntent::Buzzer(on) => {
            single(CommandCandidate::new("set_buzzer", vec![json!(encode_switch(on))]))
        }
        ControlIntent::ChildLock(on) => {
            single(CommandCandidate::new("set_child_lock", vec![json!(encode_switch(on))]))
        }
    }
}

/// Tri-state indicator levels accepted by `set_led_b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedBrightness {
    Bright = 0,
    Dim = 1,
    Off = 2,
}

/// Whether a write reply carries an explicit success marker
///
/// Only `["ok", ...]` and `[0, ...]` count; anything else is ambiguous and
/// treated as a failure.
pub fn is_acknowledged(reply: &Value) -> bool {
    match reply.as_array().and_then(|items| items.first()) {
        Some(Value::String(s)) => s == "ok",
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// What to do after recording one candidate's outcome
#[derive(Debug)]
pub enum Step<T> {
    /// Try the next candidate; carries the `Unsupported` error that caused it
    Advance(ApiError),
    /// Stop and surface this error
    Abort(ApiError),
    /// The write went through
    Succeed(T),
}

/// Walks a list of candidates: first success wins, `Unsupported` advances,
/// anything else aborts
#[derive(Debug, Clone)]
pub struct FallbackChain {
    candidates: Vec<CommandCandidate>,
    position: usize,
}

impl FallbackChain {
    pub fn new(candidates: Vec<CommandCandidate>) -> Self {
        Self {
            candidates,
            position: 0,
        }
    }

    /// Candidate to try next, `None` once the chain has finished
    pub fn current(&self) -> Option<&CommandCandidate> {
        self.candidates.get(self.position)
    }

    /// Record the outcome of [`FallbackChain::current`]
    pub fn record<T>(&mut self, outcome: Result<T, ApiError>) -> Step<T> {
        let step = match outcome {
            Ok(reply) => Step::Succeed(reply),
            Err(e) if e.is_unsupported() && self.position + 1 < self.candidates.len() => {
                Step::Advance(e)
            }
            Err(e) => Step::Abort(e),
        };

        self.position = match step {
            Step::Advance(_) => self.position + 1,
            _ => self.candidates.len(),
        };
        step
    }
}
