//! Daemon state — the central struct threaded through the event loop.
//!
//! Single `DaemonState` struct owns everything, passed as `&mut` to all
//! event-loop callbacks and IPC handlers.

use std::time::Instant;

use crate::detector::Frame;
use crate::gesture::{Action, GestureEngine};
use crate::ipc::IpcServer;
use crate::keys::KeySink;

pub struct DaemonState {
    pub engine: GestureEngine,
    pub sink: Box<dyn KeySink>,
    pub ipc_server: IpcServer,
    pub signal: calloop::LoopSignal,

    /// Process only every (N+1)-th detector frame; 0 processes all.
    pub skip_frames: u32,

    // Session counters, exposed over IPC.
    frames_seen: u64,
    frames_processed: u64,
    actions_emitted: u64,
    started: Instant,
}

impl DaemonState {
    pub fn new(
        engine: GestureEngine,
        sink: Box<dyn KeySink>,
        ipc_server: IpcServer,
        signal: calloop::LoopSignal,
        skip_frames: u32,
    ) -> Self {
        Self {
            engine,
            sink,
            ipc_server,
            signal,
            skip_frames,
            frames_seen: 0,
            frames_processed: 0,
            actions_emitted: 0,
            started: Instant::now(),
        }
    }

    /// Apply the frame-skip policy and drive one engine evaluation.
    ///
    /// Skipping happens here, before the engine ever sees a frame: the
    /// engine keeps only wall-clock state, so dropping frames upstream
    /// cannot affect its correctness.
    pub fn handle_frame(&mut self, frame: Frame) {
        self.frames_seen += 1;
        if self.skip_frames > 0 && (self.frames_seen - 1) % u64::from(self.skip_frames + 1) != 0 {
            return;
        }
        self.frames_processed += 1;

        if let Some(action) = self.engine.process_frame(frame.hand.as_deref(), frame.t) {
            self.actions_emitted += 1;
            self.sink.press(action);
            self.broadcast_action(action, frame.t);
        }
    }

    fn broadcast_action(&mut self, action: Action, t: f64) {
        let event = format!(
            "(:type :event :name :action :action :{} :t {:.3})",
            action.as_str(),
            t,
        );
        IpcServer::broadcast_event(self, &event);
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:uptime-secs {:.1} :clients {} :engine {})",
            self.started.elapsed().as_secs_f64(),
            self.ipc_server.clients.len(),
            self.engine.status_sexp(),
        )
    }

    /// Generate s-expression for IPC stats.
    pub fn stats_sexp(&self) -> String {
        format!(
            "(:frames-seen {} :frames-processed {} :actions-emitted {})",
            self.frames_seen, self.frames_processed, self.actions_emitted,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{EngineConfig, Point};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct SharedSink(Arc<Mutex<Vec<Action>>>);

    impl KeySink for SharedSink {
        fn press(&mut self, action: Action) {
            self.0.lock().unwrap().push(action);
        }
    }

    fn state_with_sink() -> (DaemonState, Arc<Mutex<Vec<Action>>>) {
        let pressed = Arc::new(Mutex::new(Vec::new()));
        let engine = GestureEngine::new(EngineConfig::default()).unwrap();
        let event_loop: calloop::EventLoop<DaemonState> = calloop::EventLoop::try_new().unwrap();
        let state = DaemonState::new(
            engine,
            Box::new(SharedSink(pressed.clone())),
            IpcServer::new(PathBuf::from("/tmp/handctl-test.sock")),
            event_loop.get_signal(),
            0,
        );
        (state, pressed)
    }

    fn fist_frame(t: f64) -> Frame {
        let wrist = Point::new(100.0, 100.0);
        let mut points = vec![wrist; 21];
        for (pip, tip) in [(6usize, 8usize), (10, 12), (14, 16), (18, 20)] {
            points[pip] = Point::new(wrist.x + 20.0, wrist.y);
            points[tip] = Point::new(wrist.x + 10.0, wrist.y);
        }
        Frame {
            t,
            hand: Some(points),
        }
    }

    #[test]
    fn test_frame_drives_sink() {
        let (mut state, pressed) = state_with_sink();
        state.handle_frame(fist_frame(0.0));
        assert_eq!(*pressed.lock().unwrap(), vec![Action::Down]);
    }

    #[test]
    fn test_skip_frames_policy() {
        let (mut state, pressed) = state_with_sink();
        state.skip_frames = 1;
        // Frames at 1-second spacing so the cooldown never interferes;
        // every other frame is dropped before the engine sees it.
        for i in 0..6 {
            state.handle_frame(fist_frame(i as f64));
        }
        assert_eq!(pressed.lock().unwrap().len(), 3);
        assert!(state.stats_sexp().contains(":frames-seen 6"));
        assert!(state.stats_sexp().contains(":frames-processed 3"));
    }

    #[test]
    fn test_stats_track_emissions() {
        let (mut state, _pressed) = state_with_sink();
        state.handle_frame(fist_frame(0.0));
        state.handle_frame(fist_frame(0.01)); // inside cooldown, no emit
        let stats = state.stats_sexp();
        assert!(stats.contains(":frames-processed 2"), "got {stats}");
        assert!(stats.contains(":actions-emitted 1"), "got {stats}");
    }
}
