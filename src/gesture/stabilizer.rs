//! Hysteresis and rate limiting for classified gestures.
//!
//! Raw per-frame reads flicker: the detector drops a frame, a pointing
//! hand crosses a band edge, a fist half-opens.  The stabilizer holds a
//! belief about the ongoing gesture, bridges single-frame dropouts, and
//! rate-limits how often each action reaches the key sink.

use std::collections::HashMap;

use tracing::debug;

// ── Actions ────────────────────────────────────────────────

/// A discrete control event delivered downstream as an arrow key.
///
/// `Down` is the roll action: it is reached through the fist gesture,
/// never through a pointing angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
}

impl Action {
    /// String representation for IPC and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub const ALL: [Action; 4] = [Action::Left, Action::Right, Action::Up, Action::Down];
}

// ── Stabilizer ─────────────────────────────────────────────

/// Debouncing state for one session.
///
/// Created at session start, mutated only through [`Stabilizer::evaluate`],
/// discarded at session end.  Timestamps are monotonic seconds; no
/// frame-count state is kept, so upstream frame skipping cannot affect
/// correctness.
pub struct Stabilizer {
    /// Minimum interval between two emissions of the same action (seconds).
    cooldown_seconds: f64,
    /// Consecutive identical candidates required before adopting a new
    /// direction.  1 adopts immediately.
    min_confidence_frames: u32,
    /// Hysteresis-held belief about the ongoing action.
    last_stable: Option<Action>,
    /// Per-action timestamp of the last emission; absent means never.
    last_emitted: HashMap<Action, f64>,
    /// Candidate awaiting confirmation, with its consecutive-frame count.
    pending: Option<Action>,
    pending_frames: u32,
}

impl Stabilizer {
    pub fn new(cooldown_seconds: f64, min_confidence_frames: u32) -> Self {
        Self {
            cooldown_seconds,
            min_confidence_frames,
            last_stable: None,
            last_emitted: HashMap::new(),
            pending: None,
            pending_frames: 0,
        }
    }

    /// Feed one frame's candidate action; returns the action to emit, if any.
    ///
    /// At most one action is emitted per call.  A `None` candidate never
    /// emits by itself but may be substituted with the held direction.
    pub fn evaluate(&mut self, candidate: Option<Action>, now: f64) -> Option<Action> {
        let action = self.apply_hysteresis(candidate)?;

        let last = self
            .last_emitted
            .get(&action)
            .copied()
            .unwrap_or(f64::NEG_INFINITY);
        if now - last > self.cooldown_seconds {
            self.last_emitted.insert(action, now);
            debug!(action = action.as_str(), t = now, "emit");
            Some(action)
        } else {
            None
        }
    }

    /// Hysteresis step: adopt, hold, or substitute the frame's candidate.
    fn apply_hysteresis(&mut self, candidate: Option<Action>) -> Option<Action> {
        match candidate {
            // New non-neutral gesture: adopt as soon as it is confirmed.
            Some(c) if Some(c) != self.last_stable => {
                if self.confirm(c) {
                    debug!(action = c.as_str(), "stable direction changed");
                    self.last_stable = Some(c);
                    Some(c)
                } else {
                    // Not confirmed yet: this frame still runs with the
                    // held direction.
                    self.last_stable
                }
            }
            // Ongoing gesture continues.
            Some(c) => {
                self.clear_pending();
                Some(c)
            }
            // Sticky neutral: a single ambiguous frame does not cancel an
            // ongoing directional gesture.
            None => {
                self.clear_pending();
                self.last_stable
            }
        }
    }

    /// Count consecutive sightings of `candidate`; true once it has been
    /// seen `min_confidence_frames` times in a row.
    fn confirm(&mut self, candidate: Action) -> bool {
        if self.min_confidence_frames <= 1 {
            self.clear_pending();
            return true;
        }
        if self.pending == Some(candidate) {
            self.pending_frames += 1;
        } else {
            self.pending = Some(candidate);
            self.pending_frames = 1;
        }
        if self.pending_frames >= self.min_confidence_frames {
            self.clear_pending();
            true
        } else {
            false
        }
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        self.pending_frames = 0;
    }

    /// The hysteresis-held direction, if any.
    pub fn last_stable(&self) -> Option<Action> {
        self.last_stable
    }

    /// Drop the held direction and all cooldown history.
    pub fn reset(&mut self) {
        self.last_stable = None;
        self.last_emitted.clear();
        self.clear_pending();
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let stable = self
            .last_stable
            .map(|a| format!(":{}", a.as_str()))
            .unwrap_or_else(|| "nil".to_string());
        let pending = self
            .pending
            .map(|a| format!(":{}", a.as_str()))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:stable {} :pending {} :pending-frames {} :cooldown-ms {:.0})",
            stable,
            pending,
            self.pending_frames,
            self.cooldown_seconds * 1000.0,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
