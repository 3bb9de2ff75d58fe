//! Gate state inference from dual-engine telemetry.
//!
//! Velocity is the primary motion signal. Position only disambiguates
//! between the two end stops and an intermediate stop. The guards are
//! evaluated in order and the first match wins; the `Closed` guard can only
//! fire at the all-zero point because the `Stopped` guard runs before it.

use tracing::{debug, warn};

use super::types::{GateState, GateTelemetry};

/// Derive the gate state from one telemetry sample.
pub fn classify(t: &GateTelemetry) -> GateState {
    let both_still = t.first_engine_vel == 0 && t.second_engine_vel == 0;

    let state = if t.first_engine_pos == 100 && t.second_engine_pos == 100 && both_still {
        GateState::Open
    } else if both_still && (t.first_engine_pos > 0 || t.second_engine_pos > 0) {
        GateState::Stopped
    } else if t.first_engine_pos == 0 && t.second_engine_pos == 0 && both_still {
        GateState::Closed
    } else if t.first_engine_vel > 0 || t.second_engine_vel > 0 {
        GateState::Moving
    } else {
        warn!(telemetry = ?t, "Telemetry matched no gate state rule");
        GateState::Unknown
    };

    debug!(telemetry = ?t, state = %state, "Classified gate telemetry");
    state
}
