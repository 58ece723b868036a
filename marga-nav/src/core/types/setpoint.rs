use serde::{Deserialize, Serialize};

/// Commanded body rates for one control tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    /// Forward velocity in m/s
    pub linear: f32,
    /// Angular velocity in rad/s (CCW positive)
    pub angular: f32,
}

impl Setpoint {
    /// Create a new setpoint.
    #[inline]
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Zero motion.
    #[inline]
    pub fn stop() -> Self {
        Self::default()
    }

    /// True if both rates are zero.
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }

    /// Clamp both rates to symmetric limits.
    #[inline]
    pub fn saturate(self, max_linear: f32, max_angular: f32) -> Self {
        Self {
            linear: self.linear.clamp(-max_linear, max_linear),
            angular: self.angular.clamp(-max_angular, max_angular),
        }
    }
}
