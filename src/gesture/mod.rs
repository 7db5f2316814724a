//! Gesture subsystem — landmark model, classification, and debouncing.
//!
//! Pure data logic, driven one frame at a time: landmarks go through the
//! stateless classifier, the resulting raw gesture is mapped to a
//! candidate action, and the stabilizer decides what (if anything) is
//! emitted.  Nothing in here touches a camera, a socket, or a keyboard,
//! so the whole pipeline can be driven by synthetic landmark sequences.

pub mod classifier;
pub mod engine;
pub mod landmarks;
pub mod stabilizer;

pub use classifier::{classify, RawGesture};
pub use engine::{angle_to_action, ConfigError, EngineConfig, GestureEngine};
pub use landmarks::{GestureError, HandLandmark, Point, LANDMARK_COUNT};
pub use stabilizer::{Action, Stabilizer};
