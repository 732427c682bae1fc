use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Duplex channel lifecycle.
///
/// State transitions:
/// - Disconnected -> Connecting (connect)
/// - Connecting -> Connected (channel open + session configured)
/// - Connecting -> Disconnected (capture or channel setup failure)
/// - Connected -> Disconnected (disconnect, channel error, app teardown)
///
/// `connect` is a no-op from any state other than Disconnected; there is
/// never more than one capture stream or channel per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    /// No channel, no capture stream.
    Disconnected = 0,
    /// Capture and channel setup in flight.
    Connecting = 1,
    /// Duplex channel open, session configured.
    Connected = 2,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl From<ConnectionState> for u8 {
    fn from(state: ConnectionState) -> Self {
        state as u8
    }
}

/// Conversational turn indicator, orthogonal to [`ConnectionState`].
///
/// Listening and Speaking are mutually exclusive and both imply Connected;
/// the activity resets to Idle whenever the connection leaves Connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Activity {
    #[default]
    Idle = 0,
    /// The remote peer detected local speech.
    Listening = 1,
    /// The remote peer is streaming audio back.
    Speaking = 2,
}

impl From<u8> for Activity {
    fn from(value: u8) -> Self {
        match value {
            1 => Activity::Listening,
            2 => Activity::Speaking,
            _ => Activity::Idle,
        }
    }
}

impl From<Activity> for u8 {
    fn from(activity: Activity) -> Self {
        activity as u8
    }
}

/// Atomic wrapper for [`ConnectionState`] for lock-free reads.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> ConnectionState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Compare and swap, returns true if successful.
    pub fn compare_exchange(&self, current: ConnectionState, new: ConnectionState) -> bool {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

/// Atomic wrapper for [`Activity`].
#[derive(Debug, Default)]
pub struct AtomicActivity(AtomicU8);

impl AtomicActivity {
    pub fn load(&self) -> Activity {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, activity: Activity) {
        self.0.store(activity.into(), Ordering::Release);
    }

    /// Compare and swap, returns true if successful.
    pub fn compare_exchange(&self, current: Activity, new: Activity) -> bool {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Shared runtime state of the active session.
///
/// Owned by the session controller; all session-scoped resources (capture
/// stream, playback pipeline, channel handle) live and die with it.
#[derive(Debug, Default)]
pub struct SessionShared {
    pub connection: AtomicConnectionState,
    pub activity: AtomicActivity,
    pub muted: AtomicBool,
    pub last_transcript: parking_lot::Mutex<Option<String>>,
}

impl SessionShared {
    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn set_transcript(&self, transcript: &str) {
        *self.last_transcript.lock() = Some(transcript.to_string());
    }

    /// Reset every runtime field to the disconnected baseline.
    pub fn reset(&self) {
        self.connection.store(ConnectionState::Disconnected);
        self.activity.store(Activity::Idle);
        self.set_muted(false);
        *self.last_transcript.lock() = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection.load(),
            activity: self.activity.load(),
            muted: self.muted(),
            last_transcript: self.last_transcript.lock().clone(),
        }
    }
}

/// Point-in-time view of the session, serialized to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub activity: Activity,
    pub muted: bool,
    pub last_transcript: Option<String>,
}

/// Events emitted by the session controller for the UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// Connection state changed.
    ConnectionChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Conversational activity changed.
    ActivityChanged { from: Activity, to: Activity },
    /// Local mute flag toggled.
    MuteChanged { muted: bool },
    /// A finalized transcription arrived from the remote peer.
    TranscriptReceived { transcript: String },
    /// A fatal channel error tore the session down.
    ChannelError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_roundtrip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            let value: u8 = state.into();
            let back: ConnectionState = value.into();
            assert_eq!(state, back);
        }
    }

    #[test]
    fn test_atomic_connection_state_cas() {
        let state = AtomicConnectionState::default();
        assert_eq!(state.load(), ConnectionState::Disconnected);

        // Successful CAS: the connect guard.
        assert!(state.compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting));
        assert_eq!(state.load(), ConnectionState::Connecting);

        // A second connect loses the CAS and must not change the state.
        assert!(!state.compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting));
        assert_eq!(state.load(), ConnectionState::Connecting);
    }

    #[test]
    fn test_activity_cas_guards() {
        let activity = AtomicActivity::default();

        // audio-done only applies while Speaking.
        assert!(!activity.compare_exchange(Activity::Speaking, Activity::Idle));
        assert_eq!(activity.load(), Activity::Idle);

        activity.store(Activity::Speaking);
        assert!(activity.compare_exchange(Activity::Speaking, Activity::Idle));
        assert_eq!(activity.load(), Activity::Idle);
    }

    #[test]
    fn test_reset_clears_everything() {
        let shared = SessionShared::default();
        shared.connection.store(ConnectionState::Connected);
        shared.activity.store(Activity::Speaking);
        shared.set_muted(true);
        shared.set_transcript("hello");

        shared.reset();

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
        assert_eq!(snapshot.activity, Activity::Idle);
        assert!(!snapshot.muted);
        assert!(snapshot.last_transcript.is_none());
    }
}
