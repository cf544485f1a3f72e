//! Frame wire format: `{"temperatures":[...768 numbers...]}`, row-major °C.
//!
//! The push and pull paths send byte-identical payloads for the same frame.

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::frame::{ThermalFrame, PIXELS};

#[derive(Serialize)]
struct FrameOut<'a> {
    temperatures: &'a [f32],
}

#[derive(Deserialize)]
struct FrameIn {
    temperatures: Vec<f32>,
}

pub fn encode(frame: &ThermalFrame) -> Result<String, WireError> {
    serde_json::to_string(&FrameOut {
        temperatures: &frame.temperatures()[..],
    })
    .map_err(|_| WireError::Encode)
}

pub fn decode(payload: &str) -> Result<ThermalFrame, WireError> {
    let parsed: FrameIn = serde_json::from_str(payload).map_err(|_| WireError::Decode)?;
    if parsed.temperatures.len() != PIXELS {
        return Err(WireError::WrongLength {
            expected: PIXELS,
            actual: parsed.temperatures.len(),
        });
    }
    // Out-of-range numbers parse to infinity and would not survive a re-encode.
    if parsed.temperatures.iter().any(|t| !t.is_finite()) {
        return Err(WireError::Decode);
    }
    ThermalFrame::try_from(parsed.temperatures)
}
