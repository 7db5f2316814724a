//! handctl — hand-gesture keyboard control.
//!
//! Turns a stream of hand-skeleton keypoints from an external detector
//! into debounced arrow-key presses.  The `gesture` module is the core
//! decision logic and is fully drivable by synthetic landmark sequences;
//! `detector`, `keys`, and `ipc` are the plumbing around it.

pub mod detector;
pub mod gesture;
pub mod ipc;
pub mod keys;
pub mod state;
