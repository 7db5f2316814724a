//! Hand landmark model and per-frame input validation.
//!
//! Models the 21 keypoints the external hand detector reports per frame
//! (MediaPipe hand-landmark convention: wrist first, then four joints per
//! finger from thumb to pinky).  The detector owns acquisition; this module
//! only names the indices and rejects frames that cannot be classified.

use thiserror::Error;

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks in detector output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// String representation for IPC and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    /// (tip, pip) pairs for the four non-thumb fingers.
    ///
    /// Thumb flexion is a poor discriminator for this vocabulary, so the
    /// thumb is deliberately absent.
    pub fn finger_pairs() -> [(HandLandmark, HandLandmark); 4] {
        [
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Point ──────────────────────────────────────────────────

/// A single 2-D landmark coordinate.
///
/// Units are whatever the detector reports (pixels or normalized), as long
/// as they stay consistent within a session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    pub fn distance_sq(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

// ── Errors ─────────────────────────────────────────────────

/// Rejection of one frame's landmark input.
///
/// A bad frame is equivalent to "no hand": callers log it and carry on,
/// they never let it stop the control loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GestureError {
    #[error("invalid landmark input: expected {LANDMARK_COUNT} points, got {got}")]
    InvalidCount { got: usize },
    #[error("invalid landmark input: non-finite coordinate at landmark {index}")]
    NonFinite { index: usize },
}

/// Check that a frame has exactly 21 finite landmark coordinates.
pub fn validate(points: &[Point]) -> Result<(), GestureError> {
    if points.len() != LANDMARK_COUNT {
        return Err(GestureError::InvalidCount { got: points.len() });
    }
    for (index, p) in points.iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(GestureError::NonFinite { index });
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::IndexPip.index(), 6);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::MiddlePip.index(), 10);
        assert_eq!(HandLandmark::MiddleTip.index(), 12);
        assert_eq!(HandLandmark::RingPip.index(), 14);
        assert_eq!(HandLandmark::RingTip.index(), 16);
        assert_eq!(HandLandmark::PinkyPip.index(), 18);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        assert_eq!(LANDMARK_COUNT, 21);
    }

    #[test]
    fn test_finger_pairs_skip_thumb() {
        for (tip, pip) in HandLandmark::finger_pairs() {
            assert!(tip.index() >= 5, "thumb joint in finger pairs: {:?}", tip);
            assert_eq!(tip.index(), pip.index() + 2);
        }
    }

    #[test]
    fn test_distance_sq() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_sq(&b) - 25.0).abs() < f32::EPSILON);
        assert!((b.distance_sq(&a) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_accepts_full_frame() {
        let points = vec![Point::default(); LANDMARK_COUNT];
        assert!(validate(&points).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_count() {
        let points = vec![Point::default(); 10];
        assert_eq!(
            validate(&points),
            Err(GestureError::InvalidCount { got: 10 })
        );
        assert!(validate(&[]).is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut points = vec![Point::default(); LANDMARK_COUNT];
        points[7] = Point::new(f32::NAN, 0.0);
        assert_eq!(validate(&points), Err(GestureError::NonFinite { index: 7 }));

        points[7] = Point::new(0.0, f32::INFINITY);
        assert_eq!(validate(&points), Err(GestureError::NonFinite { index: 7 }));
    }

    #[test]
    fn test_landmark_as_str() {
        assert_eq!(HandLandmark::Wrist.as_str(), "wrist");
        assert_eq!(HandLandmark::IndexTip.as_str(), "index-tip");
        assert_eq!(HandLandmark::PinkyPip.as_str(), "pinky-pip");
    }
}
