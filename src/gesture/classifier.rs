//! Stateless gesture classification from one frame of landmarks.
//!
//! Pure geometry: a landmark set goes in, exactly one `RawGesture` comes
//! out.  No state is kept between frames; the debouncing layer above owns
//! all memory of past frames.

use super::landmarks::{validate, GestureError, HandLandmark, Point};

// ── Raw gesture ────────────────────────────────────────────

/// The classifier's immediate, stateless read of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawGesture {
    /// Closed fist: at most two of the four non-thumb fingers extended.
    Roll,
    /// Pointing direction in degrees, normalized to [0, 360).
    /// Screen-up is 90°, measured counter-clockwise from the +x axis.
    Direction(f32),
    /// Hand present but no readable gesture.
    Ambiguous,
}

/// Number of extended fingers at or below which the hand reads as a fist.
const FIST_MAX_EXTENDED: usize = 2;

// ── Classification ─────────────────────────────────────────

/// Classify one frame of landmarks.
///
/// The fist check runs first and overrides any apparent pointing angle.
/// A wrist-to-fingertip vector shorter than `stability_distance` is too
/// close to a neutral pose to read a direction from, and yields
/// [`RawGesture::Ambiguous`].
pub fn classify(points: &[Point], stability_distance: f32) -> Result<RawGesture, GestureError> {
    validate(points)?;

    if is_fist(points) {
        return Ok(RawGesture::Roll);
    }

    let wrist = points[HandLandmark::Wrist.index()];
    let index_tip = points[HandLandmark::IndexTip.index()];
    let middle_tip = points[HandLandmark::MiddleTip.index()];

    // Pointing axis: wrist to the index/middle fingertip midpoint.
    let dx = (index_tip.x + middle_tip.x) / 2.0 - wrist.x;
    let dy = (index_tip.y + middle_tip.y) / 2.0 - wrist.y;

    let distance_sq = dx * dx + dy * dy;
    if distance_sq < stability_distance * stability_distance {
        return Ok(RawGesture::Ambiguous);
    }

    // Screen y grows downward; negate dy so screen-up reads as 90°.
    let angle = (-dy).atan2(dx).to_degrees().rem_euclid(360.0);
    Ok(RawGesture::Direction(angle))
}

/// Fist test over the four non-thumb fingers.
///
/// A finger counts as extended iff its tip sits farther from the wrist
/// than its pip joint.  Squared distances only — this runs on every frame
/// at up to 60 Hz and never needs the roots.
fn is_fist(points: &[Point]) -> bool {
    let wrist = points[HandLandmark::Wrist.index()];

    let mut extended = 0;
    for (tip, pip) in HandLandmark::finger_pairs() {
        let tip_sq = wrist.distance_sq(&points[tip.index()]);
        let pip_sq = wrist.distance_sq(&points[pip.index()]);
        if tip_sq > pip_sq {
            extended += 1;
        }
    }

    extended <= FIST_MAX_EXTENDED
}

// ── Test helpers ───────────────────────────────────────────

/// Build a synthetic hand with the given wrist, pointing direction, and
/// per-finger extension flags (index, middle, ring, pinky).
#[cfg(test)]
pub(crate) fn synth_hand(wrist: Point, dir_deg: f32, extended: [bool; 4]) -> Vec<Point> {
    use super::landmarks::LANDMARK_COUNT;

    let rad = dir_deg.to_radians();
    let (ux, uy) = (rad.cos(), -rad.sin());

    let mut points = vec![wrist; LANDMARK_COUNT];
    let fingers = [(6usize, 8usize), (10, 12), (14, 16), (18, 20)];
    for (i, (pip, tip)) in fingers.iter().enumerate() {
        let tip_r = if extended[i] { 40.0 } else { 10.0 };
        points[*pip] = Point::new(wrist.x + ux * 20.0, wrist.y + uy * 20.0);
        points[*tip] = Point::new(wrist.x + ux * tip_r, wrist.y + uy * tip_r);
    }
    points
}

// ── Tests ──────────────────────────────────────────────────
