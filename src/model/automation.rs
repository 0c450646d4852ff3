use serde::{Deserialize, Serialize};

use crate::constants::LINEAR_CURVE;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AutomationPoint {
    pub time: f64,
    pub value: f32,
    /// Shape of the segment starting at this point. 0.5 is linear.
    pub curve: f32,
}

impl AutomationPoint {
    pub fn new(time: f64, value: f32) -> Self {
        Self {
            time: time.max(0.0),
            value: value.clamp(0.0, 1.0),
            curve: LINEAR_CURVE,
        }
    }
}

/// (effect, parameter) pair an automation lane drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AutomationKey {
    pub effect_id: u64,
    pub parameter: String,
}

impl AutomationKey {
    pub fn new(effect_id: u64, parameter: impl Into<String>) -> Self {
        Self {
            effect_id,
            parameter: parameter.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationLane {
    /// Sorted by time, no two points share a time.
    pub(crate) points: Vec<AutomationPoint>,
    /// The parameter's current value; drawn when the lane has no points.
    pub live_value: f32,
    /// The first point was inserted implicitly at t=0 to anchor the curve.
    pub(crate) anchored: bool,
}

impl AutomationLane {
    pub fn new(live_value: f32) -> Self {
        Self {
            points: Vec::new(),
            live_value: live_value.clamp(0.0, 1.0),
            anchored: false,
        }
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for AutomationLane {
    fn default() -> Self {
        Self::new(0.5)
    }
}
