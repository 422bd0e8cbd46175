//! Full property fetch
//!
//! One poll is one batched `get_prop` request for every property the model
//! reports, decoded through the codec into a fresh [`StateSnapshot`]. The
//! loop that drives it lives with the connection manager, which owns the
//! session it polls through.

use purifier_api::{decode_properties, AirQualityThresholds, ApiError, Model};
use serde_json::Value;
use tracing::debug;

use crate::cache::StateSnapshot;
use crate::session::DeviceSession;

/// Fetch and decode the full property set in a single request
pub async fn fetch_snapshot(
    session: &DeviceSession,
    model: Model,
    thresholds: &AirQualityThresholds,
) -> Result<StateSnapshot, ApiError> {
    let params: Vec<Value> = model
        .polled_properties()
        .into_iter()
        .map(Value::from)
        .collect();

    let raw = session.call("get_prop", params).await?;
    let values = decode_properties(model, thresholds, &raw)?;
    debug!(generation = session.generation(), properties = values.len(), "Fetched properties");
    Ok(StateSnapshot::new(values))
}
