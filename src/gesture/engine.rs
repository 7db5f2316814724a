//! Gesture engine: configuration, band mapping, and frame evaluation.
//!
//! Composes the stateless classifier with the stateful stabilizer behind
//! a single `process_frame` entry point, and owns the policy that turns a
//! pointing angle into a directional action.

use thiserror::Error;
use tracing::debug;

use super::classifier::{classify, RawGesture};
use super::landmarks::Point;
use super::stabilizer::{Action, Stabilizer};

// ── Config ─────────────────────────────────────────────────

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Half-width of each directional band in degrees.  Must stay below
    /// 45 or the right/up/left bands collide.
    pub angular_threshold_deg: f32,
    /// Minimum wrist-to-fingertip-midpoint distance for a readable
    /// direction, in landmark units.
    pub stability_distance: f32,
    /// Minimum interval between two emissions of the same action (seconds).
    pub cooldown_seconds: f64,
    /// Consecutive identical frames required before a new direction is
    /// adopted.  1 adopts immediately.
    pub min_confidence_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            angular_threshold_deg: 35.0,
            stability_distance: 15.0,
            cooldown_seconds: 0.05,
            min_confidence_frames: 1,
        }
    }
}

impl EngineConfig {
    /// Validate all fields.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.angular_threshold_deg.is_finite()
            || self.angular_threshold_deg <= 0.0
            || self.angular_threshold_deg >= 45.0
        {
            return Err(ConfigError::AngularThreshold(self.angular_threshold_deg));
        }
        if !self.stability_distance.is_finite() || self.stability_distance < 0.0 {
            return Err(ConfigError::StabilityDistance(self.stability_distance));
        }
        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds < 0.0 {
            return Err(ConfigError::Cooldown(self.cooldown_seconds));
        }
        if self.min_confidence_frames < 1 {
            return Err(ConfigError::ConfidenceFrames(self.min_confidence_frames));
        }
        Ok(())
    }
}

/// Configuration rejected at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("angular threshold must be in (0, 45) degrees, got {0}")]
    AngularThreshold(f32),
    #[error("stability distance must be finite and non-negative, got {0}")]
    StabilityDistance(f32),
    #[error("cooldown must be finite and non-negative, got {0} seconds")]
    Cooldown(f64),
    #[error("min confidence frames must be at least 1, got {0}")]
    ConfidenceFrames(u32),
}

// ── Band mapping ───────────────────────────────────────────

/// Map a pointing angle to a directional action.
///
/// Three bands of half-width `threshold`, centered on 0°/360° (right),
/// 90° (up), and 180° (left); boundaries are inclusive.  There is no down
/// band — the roll gesture covers the down action — so everything else
/// is `None`.
pub fn angle_to_action(angle: f32, threshold: f32) -> Option<Action> {
    if angle <= threshold || angle >= 360.0 - threshold {
        Some(Action::Right)
    } else if (90.0 - threshold..=90.0 + threshold).contains(&angle) {
        Some(Action::Up)
    } else if (180.0 - threshold..=180.0 + threshold).contains(&angle) {
        Some(Action::Left)
    } else {
        None
    }
}

// ── Engine ─────────────────────────────────────────────────

/// One session's gesture engine.
pub struct GestureEngine {
    config: EngineConfig,
    stabilizer: Stabilizer,
}

impl GestureEngine {
    /// Create an engine, failing fast on invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stabilizer = Stabilizer::new(config.cooldown_seconds, config.min_confidence_frames);
        Ok(Self { config, stabilizer })
    }

    /// Evaluate one frame.
    ///
    /// `hand` is `None` when the detector reported no hand.  Malformed
    /// landmark input is logged and treated the same way — a single bad
    /// frame never stops the control loop.  Returns the action to deliver
    /// downstream, if any.
    pub fn process_frame(&mut self, hand: Option<&[Point]>, now: f64) -> Option<Action> {
        let raw = match hand {
            Some(points) => match classify(points, self.config.stability_distance) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("rejecting frame: {e}");
                    RawGesture::Ambiguous
                }
            },
            None => RawGesture::Ambiguous,
        };

        let candidate = match raw {
            RawGesture::Roll => Some(Action::Down),
            RawGesture::Direction(angle) => {
                angle_to_action(angle, self.config.angular_threshold_deg)
            }
            RawGesture::Ambiguous => None,
        };

        self.stabilizer.evaluate(candidate, now)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The stabilizer's currently held direction, if any.
    pub fn last_stable(&self) -> Option<Action> {
        self.stabilizer.last_stable()
    }

    /// Drop all session state (held direction, cooldown history).
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!("(:stabilizer {})", self.stabilizer.status_sexp())
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:threshold-deg {:.1} :stability-distance {:.1} :cooldown-ms {:.0} :min-confidence-frames {})",
            self.config.angular_threshold_deg,
            self.config.stability_distance,
            self.config.cooldown_seconds * 1000.0,
            self.config.min_confidence_frames,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::classifier::synth_hand;

    fn engine() -> GestureEngine {
        GestureEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_wide_threshold() {
        for bad in [45.0, 46.0, 90.0, f32::INFINITY, f32::NAN, 0.0, -1.0] {
            let config = EngineConfig {
                angular_threshold_deg: bad,
                ..EngineConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::AngularThreshold(_))),
                "threshold {bad} should be rejected"
            );
        }
        // Just inside the limit is fine.
        let config = EngineConfig {
            angular_threshold_deg: 44.9,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_negative_cooldown() {
        let config = EngineConfig {
            cooldown_seconds: -0.01,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Cooldown(-0.01)));
    }

    #[test]
    fn test_config_rejects_bad_stability_distance() {
        let config = EngineConfig {
            stability_distance: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StabilityDistance(_))
        ));
    }

    #[test]
    fn test_config_rejects_zero_confidence_frames() {
        let config = EngineConfig {
            min_confidence_frames: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ConfidenceFrames(0)));
    }

    #[test]
    fn test_band_centers() {
        assert_eq!(angle_to_action(0.0, 35.0), Some(Action::Right));
        assert_eq!(angle_to_action(90.0, 35.0), Some(Action::Up));
        assert_eq!(angle_to_action(180.0, 35.0), Some(Action::Left));
        assert_eq!(angle_to_action(359.99, 35.0), Some(Action::Right));
    }

    #[test]
    fn test_band_edges_inclusive() {
        assert_eq!(angle_to_action(35.0, 35.0), Some(Action::Right));
        assert_eq!(angle_to_action(325.0, 35.0), Some(Action::Right));
        assert_eq!(angle_to_action(55.0, 35.0), Some(Action::Up));
        assert_eq!(angle_to_action(125.0, 35.0), Some(Action::Up));
        assert_eq!(angle_to_action(145.0, 35.0), Some(Action::Left));
        assert_eq!(angle_to_action(215.0, 35.0), Some(Action::Left));
    }

    #[test]
    fn test_gaps_and_bottom_map_to_none() {
        assert_eq!(angle_to_action(40.0, 35.0), None);
        assert_eq!(angle_to_action(140.0, 35.0), None);
        // The whole bottom half-plane: no down band by design.
        for angle in [216.0, 250.0, 270.0, 300.0, 324.0] {
            assert_eq!(angle_to_action(angle, 35.0), None, "angle {angle}");
        }
    }

    #[test]
    fn test_bands_disjoint_below_45() {
        // Each angle matches at most one band predicate.
        let threshold = 44.9_f32;
        let mut angle = 0.0_f32;
        while angle < 360.0 {
            let right = angle <= threshold || angle >= 360.0 - threshold;
            let up = (90.0 - threshold..=90.0 + threshold).contains(&angle);
            let left = (180.0 - threshold..=180.0 + threshold).contains(&angle);
            let hits = right as u8 + up as u8 + left as u8;
            assert!(hits <= 1, "bands overlap at {angle}");
            angle += 0.1;
        }
    }

    #[test]
    fn test_roll_maps_to_down() {
        let mut engine = engine();
        let fist = synth_hand(Point::new(50.0, 50.0), 0.0, [false; 4]);
        assert_eq!(engine.process_frame(Some(&fist), 0.0), Some(Action::Down));
    }

    #[test]
    fn test_pointing_right_maps_to_right() {
        let mut engine = engine();
        let hand = synth_hand(Point::new(50.0, 50.0), 0.0, [true; 4]);
        assert_eq!(engine.process_frame(Some(&hand), 0.0), Some(Action::Right));
    }

    #[test]
    fn test_no_hand_is_neutral() {
        let mut engine = engine();
        assert_eq!(engine.process_frame(None, 0.0), None);
        assert_eq!(engine.last_stable(), None);
    }

    #[test]
    fn test_invalid_frame_is_neutral_not_fatal() {
        let mut engine = engine();
        let garbage = vec![Point::new(f32::NAN, 0.0); 21];
        assert_eq!(engine.process_frame(Some(&garbage), 0.0), None);
        // The engine keeps working afterwards.
        let hand = synth_hand(Point::new(50.0, 50.0), 90.0, [true; 4]);
        assert_eq!(engine.process_frame(Some(&hand), 0.1), Some(Action::Up));
    }

    #[test]
    fn test_out_of_band_angle_holds_previous_direction() {
        let mut engine = engine();
        let up = synth_hand(Point::new(50.0, 50.0), 90.0, [true; 4]);
        assert_eq!(engine.process_frame(Some(&up), 0.0), Some(Action::Up));
        // 45° falls between the right and up bands; the held direction
        // carries the frame.
        let diagonal = synth_hand(Point::new(50.0, 50.0), 45.0, [true; 4]);
        assert_eq!(engine.process_frame(Some(&diagonal), 0.1), Some(Action::Up));
    }

    #[test]
    fn test_status_and_config_sexp() {
        let engine = engine();
        assert!(engine.status_sexp().contains(":stabilizer"));
        let config = engine.config_sexp();
        assert!(config.contains(":threshold-deg 35.0"));
        assert!(config.contains(":cooldown-ms 50"));
        assert!(config.contains(":min-confidence-frames 1"));
    }
}
