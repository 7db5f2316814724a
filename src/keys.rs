//! Key injection: deliver emitted actions as arrow-key presses.

use enigo::{Enigo, Key, KeyboardControllable};
use tracing::{debug, info};

use crate::gesture::Action;

/// Downstream consumer of emitted actions.
///
/// The engine decides *whether* to emit; sinks only deliver.  A sink must
/// never propagate delivery problems back into the control loop.
pub trait KeySink {
    fn press(&mut self, action: Action);
}

/// Arrow-key sink backed by the OS-level input simulator.
pub struct ArrowKeys {
    enigo: Enigo,
}

impl ArrowKeys {
    pub fn new() -> Self {
        Self {
            enigo: Enigo::new(),
        }
    }
}

impl KeySink for ArrowKeys {
    fn press(&mut self, action: Action) {
        let key = match action {
            Action::Left => Key::LeftArrow,
            Action::Right => Key::RightArrow,
            Action::Up => Key::UpArrow,
            Action::Down => Key::DownArrow,
        };
        debug!(action = action.as_str(), "key press");
        self.enigo.key_click(key);
    }
}

/// Logging-only sink for dry runs.
pub struct NullSink;

impl KeySink for NullSink {
    fn press(&mut self, action: Action) {
        info!(action = action.as_str(), "action (dry run)");
    }
}

// ── Tests ──────────────────────────────────────────────────
