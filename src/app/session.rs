//! Streaming session controller.
//!
//! Owns the duplex channel and every session-scoped resource: microphone
//! capture, playback pipeline, channel handle. All of them are created in
//! `connect` and released by one teardown routine that serves explicit
//! disconnect, channel failure, and app shutdown alike.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::events::SessionConfig;
use crate::domain::session::{
    Activity, ConnectionState, SessionEvent, SessionShared, SessionSnapshot,
};
use crate::domain::settings::VoiceSettings;
use crate::domain::{pcm, ClientEvent, DomainError, ServerEvent};
use crate::ports::{
    AudioCapture, AudioOutput, CaptureConstraints, CaptureHandle, ChannelHandle, ChatLog,
    PlaybackHandle, RealtimeChannel,
};

/// Capacity of the UI-facing session event feed.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The streaming session controller.
///
/// At most one session is live at a time; `connect` while a session exists
/// is a no-op reporting the current state.
pub struct SessionController {
    capture: Arc<dyn AudioCapture>,
    output: Arc<dyn AudioOutput>,
    channel: Arc<dyn RealtimeChannel>,
    chat: Arc<dyn ChatLog>,
    settings: Arc<RwLock<VoiceSettings>>,
    transcription_model: String,
    shared: Arc<SessionShared>,
    events: broadcast::Sender<SessionEvent>,
    active: Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionController {
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        output: Arc<dyn AudioOutput>,
        channel: Arc<dyn RealtimeChannel>,
        chat: Arc<dyn ChatLog>,
        settings: Arc<RwLock<VoiceSettings>>,
        transcription_model: String,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            capture,
            output,
            channel,
            chat,
            settings,
            transcription_model,
            shared: Arc::new(SessionShared::default()),
            events,
            active: Mutex::new(None),
        }
    }

    /// Open a voice session bound to a support-chat session.
    ///
    /// Resource acquisition order is microphone, playback pipeline, channel;
    /// a failure at any step releases whatever was acquired through the same
    /// teardown routine the other exit paths use.
    pub async fn connect(&self, chat_session_id: String) -> Result<SessionSnapshot, DomainError> {
        let settings = self.settings.read().clone().sanitized();
        if !settings.enabled {
            return Err(DomainError::VoiceDisabled);
        }

        let mut active = self.active.lock().await;

        // The CAS is the connect guard: only one caller can move the state
        // out of Disconnected, everyone else reports the existing session.
        if !self
            .shared
            .connection
            .compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting)
        {
            debug!(state = ?self.shared.connection.load(), "connect is a no-op");
            return Ok(self.shared.snapshot());
        }
        self.emit(SessionEvent::ConnectionChanged {
            from: ConnectionState::Disconnected,
            to: ConnectionState::Connecting,
        });

        let constraints = CaptureConstraints::from_settings(&settings);
        let capture = match self.capture.start(constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Microphone acquisition failed");
                Self::teardown(&self.shared, &self.events, None, None, None);
                return Err(e);
            }
        };

        let playback = match self.output.open().await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Playback pipeline setup failed");
                Self::teardown(&self.shared, &self.events, Some(capture), None, None);
                return Err(e);
            }
        };

        let channel = match self.channel.connect().await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Channel open failed");
                Self::teardown(&self.shared, &self.events, Some(capture), Some(playback), None);
                return Err(e);
            }
        };

        // One-time session configuration, the first event on the wire.
        let session_config = SessionConfig::from_settings(&settings, &self.transcription_model);
        if channel
            .outbound
            .send(ClientEvent::SessionUpdate {
                session: session_config,
            })
            .await
            .is_err()
        {
            Self::teardown(
                &self.shared,
                &self.events,
                Some(capture),
                Some(playback),
                Some(channel),
            );
            return Err(DomainError::Channel(
                "channel closed before session configuration".to_string(),
            ));
        }

        self.shared.connection.store(ConnectionState::Connected);
        self.emit(SessionEvent::ConnectionChanged {
            from: ConnectionState::Connecting,
            to: ConnectionState::Connected,
        });
        info!(chat_session_id = %chat_session_id, "Voice session connected");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = SessionTask {
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            chat: Arc::clone(&self.chat),
            settings: Arc::clone(&self.settings),
            chat_session_id,
        };
        let handle = tokio::spawn(task.run(capture, channel, playback, shutdown_rx));
        *active = Some(ActiveSession {
            shutdown_tx,
            task: handle,
        });

        Ok(self.shared.snapshot())
    }

    /// Close the session and release all resources. Idempotent.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(session) => {
                let _ = session.shutdown_tx.send(true);
                if let Err(e) = session.task.await {
                    warn!(error = %e, "Session task ended abnormally");
                }
                info!("Voice session disconnected");
            }
            None => {
                // Nothing running; make sure the state is at baseline.
                self.shared.reset();
            }
        }
    }

    /// Toggle the local mute flag. Instantaneous: capture keeps running and
    /// the channel is never touched, muted frames are simply discarded.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.shared.muted();
        self.shared.set_muted(muted);
        self.emit(SessionEvent::MuteChanged { muted });
        info!(muted = muted, "Mute toggled");
        muted
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot()
    }

    /// Subscribe to the session event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// The single cleanup routine.
    ///
    /// Runs on explicit disconnect, on channel error, on connect failure and
    /// on app teardown. Stops capture, drops the playback pipeline and the
    /// channel handle, resets the runtime state. Safe to run with any subset
    /// of resources and safe to run twice.
    fn teardown(
        shared: &SessionShared,
        events: &broadcast::Sender<SessionEvent>,
        capture: Option<CaptureHandle>,
        playback: Option<PlaybackHandle>,
        channel: Option<ChannelHandle>,
    ) {
        let from = shared.connection.load();
        if let Some(mut handle) = capture {
            handle.stop();
        }
        drop(playback);
        drop(channel);
        shared.reset();
        if from != ConnectionState::Disconnected {
            let _ = events.send(SessionEvent::ConnectionChanged {
                from,
                to: ConnectionState::Disconnected,
            });
        }
        debug!("Session resources released");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Best effort: signal the loop, which owns the actual cleanup.
        if let Some(session) = self.active.get_mut().take() {
            let _ = session.shutdown_tx.send(true);
        }
    }
}

/// State shared with the spawned session event loop.
struct SessionTask {
    shared: Arc<SessionShared>,
    events: broadcast::Sender<SessionEvent>,
    chat: Arc<dyn ChatLog>,
    settings: Arc<RwLock<VoiceSettings>>,
    chat_session_id: String,
}

impl SessionTask {
    /// The session event loop.
    ///
    /// Captured frames are encoded and sent in capture order; inbound events
    /// are dispatched in arrival order. Every exit path funnels into
    /// [`SessionController::teardown`].
    async fn run(
        self,
        mut capture: CaptureHandle,
        mut channel: ChannelHandle,
        playback: PlaybackHandle,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let failure: Option<String> = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    let _ = changed;
                    break None;
                }
                frame = capture.frames.recv() => match frame {
                    Some(samples) => {
                        if self.shared.muted() {
                            // Discarded, not buffered: capture keeps running
                            // so un-muting is instantaneous.
                            continue;
                        }
                        let audio = pcm::to_wire(&pcm::encode_frame(&samples));
                        if channel
                            .outbound
                            .send(ClientEvent::InputAudioAppend { audio })
                            .await
                            .is_err()
                        {
                            break Some("channel closed while sending audio".to_string());
                        }
                    }
                    None => break Some("capture stream ended unexpectedly".to_string()),
                },
                event = channel.inbound.recv() => match event {
                    Some(event) => self.dispatch(event, &playback).await,
                    None => break Some("channel closed by peer".to_string()),
                },
            }
        };

        if let Some(message) = failure {
            error!(error = %message, "Voice session failed");
            let _ = self.events.send(SessionEvent::ChannelError { message });
        }
        SessionController::teardown(
            &self.shared,
            &self.events,
            Some(capture),
            Some(playback),
            Some(channel),
        );
    }

    /// Dispatch one inbound event.
    async fn dispatch(&self, event: ServerEvent, playback: &PlaybackHandle) {
        match event {
            ServerEvent::AudioDelta { delta } => {
                self.set_activity(Activity::Speaking);
                // A malformed chunk is dropped; the session continues.
                match pcm::decode_chunk(&delta) {
                    Ok(bytes) => {
                        let wav = pcm::wav_wrap(&bytes);
                        if let Err(e) = playback.play(wav, self.gain()) {
                            warn!(error = %e, "Failed to schedule audio chunk");
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropped malformed audio chunk"),
                }
            }
            ServerEvent::AudioDone => {
                if self
                    .shared
                    .activity
                    .compare_exchange(Activity::Speaking, Activity::Idle)
                {
                    self.emit_activity(Activity::Speaking, Activity::Idle);
                }
            }
            ServerEvent::TranscriptionCompleted { transcript } => {
                self.shared.set_transcript(&transcript);
                let _ = self.events.send(SessionEvent::TranscriptReceived {
                    transcript: transcript.clone(),
                });
                // Best-effort side channel: a relay failure never affects
                // the audio session.
                if let Err(e) = self
                    .chat
                    .append_transcript(&self.chat_session_id, &transcript)
                    .await
                {
                    warn!(error = %e, "Transcript relay failed");
                }
            }
            ServerEvent::SpeechStarted => self.set_activity(Activity::Listening),
            ServerEvent::SpeechStopped => {
                if self
                    .shared
                    .activity
                    .compare_exchange(Activity::Listening, Activity::Idle)
                {
                    self.emit_activity(Activity::Listening, Activity::Idle);
                }
            }
            ServerEvent::Unknown => debug!("Ignoring unconsumed event kind"),
        }
    }

    fn set_activity(&self, to: Activity) {
        let from = self.shared.activity.load();
        if from != to {
            self.shared.activity.store(to);
            self.emit_activity(from, to);
        }
    }

    fn emit_activity(&self, from: Activity, to: Activity) {
        let _ = self
            .events
            .send(SessionEvent::ActivityChanged { from, to });
    }

    fn gain(&self) -> f32 {
        self.settings.read().volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    use crate::ports::PlaybackChunk;

    struct MockCapture {
        starts: AtomicUsize,
        fail_permission: AtomicBool,
        frames_tx: SyncMutex<Option<mpsc::Sender<Vec<f32>>>>,
    }

    impl MockCapture {
        fn new() -> Self {
            Self {
                starts: AtomicUsize::new(0),
                fail_permission: AtomicBool::new(false),
                frames_tx: SyncMutex::new(None),
            }
        }

        fn frames_sender(&self) -> mpsc::Sender<Vec<f32>> {
            self.frames_tx.lock().clone().expect("capture not started")
        }
    }

    #[async_trait]
    impl AudioCapture for MockCapture {
        async fn start(
            &self,
            _constraints: CaptureConstraints,
        ) -> Result<CaptureHandle, DomainError> {
            if self.fail_permission.load(Ordering::SeqCst) {
                return Err(DomainError::PermissionDenied);
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            let (frames_tx, frames_rx) = mpsc::channel(32);
            let (stop_tx, _stop_rx) = mpsc::channel(1);
            *self.frames_tx.lock() = Some(frames_tx);
            Ok(CaptureHandle::new(frames_rx, stop_tx))
        }
    }

    struct MockOutput {
        chunks_rx: SyncMutex<Option<mpsc::UnboundedReceiver<PlaybackChunk>>>,
    }

    impl MockOutput {
        fn new() -> Self {
            Self {
                chunks_rx: SyncMutex::new(None),
            }
        }

        fn take_chunks(&self) -> mpsc::UnboundedReceiver<PlaybackChunk> {
            self.chunks_rx.lock().take().expect("output not opened")
        }
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        async fn open(&self) -> Result<PlaybackHandle, DomainError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.chunks_rx.lock() = Some(rx);
            Ok(PlaybackHandle::new(tx))
        }
    }

    struct MockChannel {
        connects: AtomicUsize,
        outbound_rx: SyncMutex<Option<mpsc::Receiver<ClientEvent>>>,
        inbound_tx: SyncMutex<Option<mpsc::Sender<ServerEvent>>>,
    }

    impl MockChannel {
        fn new() -> Self {
            Self {
                connects: AtomicUsize::new(0),
                outbound_rx: SyncMutex::new(None),
                inbound_tx: SyncMutex::new(None),
            }
        }

        fn take_outbound(&self) -> mpsc::Receiver<ClientEvent> {
            self.outbound_rx.lock().take().expect("channel not connected")
        }

        fn inbound_sender(&self) -> mpsc::Sender<ServerEvent> {
            self.inbound_tx.lock().clone().expect("channel not connected")
        }

        fn drop_inbound(&self) {
            self.inbound_tx.lock().take();
        }
    }

    #[async_trait]
    impl RealtimeChannel for MockChannel {
        async fn connect(&self) -> Result<ChannelHandle, DomainError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let (outbound_tx, outbound_rx) = mpsc::channel(64);
            let (inbound_tx, inbound_rx) = mpsc::channel(64);
            *self.outbound_rx.lock() = Some(outbound_rx);
            *self.inbound_tx.lock() = Some(inbound_tx);
            Ok(ChannelHandle {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        }
    }

    struct MockChat {
        appended: SyncMutex<Vec<(String, String)>>,
    }

    impl MockChat {
        fn new() -> Self {
            Self {
                appended: SyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatLog for MockChat {
        async fn append_transcript(
            &self,
            chat_session_id: &str,
            transcript: &str,
        ) -> Result<(), DomainError> {
            self.appended
                .lock()
                .push((chat_session_id.to_string(), transcript.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        controller: SessionController,
        capture: Arc<MockCapture>,
        output: Arc<MockOutput>,
        channel: Arc<MockChannel>,
        chat: Arc<MockChat>,
    }

    fn fixture() -> Fixture {
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockOutput::new());
        let channel = Arc::new(MockChannel::new());
        let chat = Arc::new(MockChat::new());
        let settings = Arc::new(RwLock::new(VoiceSettings {
            enabled: true,
            ..Default::default()
        }));
        let controller = SessionController::new(
            Arc::clone(&capture) as Arc<dyn AudioCapture>,
            Arc::clone(&output) as Arc<dyn AudioOutput>,
            Arc::clone(&channel) as Arc<dyn RealtimeChannel>,
            Arc::clone(&chat) as Arc<dyn ChatLog>,
            settings,
            "whisper-1".to_string(),
        );
        Fixture {
            controller,
            capture,
            output,
            channel,
            chat,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    async fn recv_event(
        rx: &mut mpsc::Receiver<ClientEvent>,
    ) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for outbound event")
            .expect("outbound channel closed")
    }

    #[tokio::test]
    async fn test_connect_refused_while_disabled() {
        let fx = fixture();
        {
            let settings = Arc::new(RwLock::new(VoiceSettings::default()));
            let controller = SessionController::new(
                Arc::clone(&fx.capture) as Arc<dyn AudioCapture>,
                Arc::clone(&fx.output) as Arc<dyn AudioOutput>,
                Arc::clone(&fx.channel) as Arc<dyn RealtimeChannel>,
                Arc::clone(&fx.chat) as Arc<dyn ChatLog>,
                settings,
                "whisper-1".to_string(),
            );
            let err = controller.connect("sess-1".to_string()).await.unwrap_err();
            assert!(matches!(err, DomainError::VoiceDisabled));
            assert_eq!(fx.capture.starts.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_connect_sends_session_update_first() {
        let fx = fixture();
        let snapshot = fx.controller.connect("sess-1".to_string()).await.unwrap();
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(snapshot.activity, Activity::Idle);

        let mut outbound = fx.channel.take_outbound();
        let first = recv_event(&mut outbound).await;
        let value = serde_json::to_value(&first).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["voice"], "alloy");
        assert_eq!(value["session"]["turn_detection"]["type"], "server_vad");

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_connect_is_noop_while_connected() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();

        // A second connect reports the existing session and opens nothing.
        let snapshot = fx.controller.connect("sess-1".to_string()).await.unwrap();
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(fx.capture.starts.load(Ordering::SeqCst), 1);
        assert_eq!(fx.channel.connects.load(Ordering::SeqCst), 1);

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_capture_failure_surfaces_and_resets() {
        let fx = fixture();
        fx.capture.fail_permission.store(true, Ordering::SeqCst);

        let err = fx.controller.connect("sess-1".to_string()).await.unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied));
        assert_eq!(
            fx.controller.snapshot().connection,
            ConnectionState::Disconnected
        );

        // The failed attempt leaves nothing behind; a retry succeeds.
        fx.capture.fail_permission.store(false, Ordering::SeqCst);
        let snapshot = fx.controller.connect("sess-1".to_string()).await.unwrap();
        assert_eq!(snapshot.connection, ConnectionState::Connected);

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_mute_gates_outbound_audio() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();

        let mut outbound = fx.channel.take_outbound();
        let _session_update = recv_event(&mut outbound).await;

        let frames = fx.capture.frames_sender();

        assert!(fx.controller.toggle_mute());
        frames.send(vec![0.5f32; 240]).await.unwrap();
        frames.send(vec![-0.5f32; 240]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Muted frames are discarded before transmission.
        assert!(outbound.try_recv().is_err());

        // Un-muting resumes transmission without a new capture stream.
        assert!(!fx.controller.toggle_mute());
        frames.send(vec![0.25f32; 240]).await.unwrap();
        let event = recv_event(&mut outbound).await;
        assert!(matches!(event, ClientEvent::InputAudioAppend { .. }));
        assert_eq!(fx.capture.starts.load(Ordering::SeqCst), 1);

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_frames_are_sent_in_capture_order() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();

        let mut outbound = fx.channel.take_outbound();
        let _session_update = recv_event(&mut outbound).await;

        let frames = fx.capture.frames_sender();
        frames.send(vec![0.0f32; 4]).await.unwrap();
        frames.send(vec![1.0f32; 4]).await.unwrap();

        let first = recv_event(&mut outbound).await;
        let second = recv_event(&mut outbound).await;
        let expected_zero = pcm::to_wire(&pcm::encode_frame(&[0.0f32; 4]));
        let expected_one = pcm::to_wire(&pcm::encode_frame(&[1.0f32; 4]));
        assert_eq!(
            first,
            ClientEvent::InputAudioAppend {
                audio: expected_zero
            }
        );
        assert_eq!(
            second,
            ClientEvent::InputAudioAppend {
                audio: expected_one
            }
        );

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_conversation_flow() {
        let fx = fixture();
        fx.controller.connect("sess-42".to_string()).await.unwrap();
        let inbound = fx.channel.inbound_sender();
        let mut chunks = fx.output.take_chunks();

        // The remote peer hears the agent speak.
        inbound.send(ServerEvent::SpeechStarted).await.unwrap();
        wait_until(|| fx.controller.snapshot().activity == Activity::Listening).await;

        inbound.send(ServerEvent::SpeechStopped).await.unwrap();
        wait_until(|| fx.controller.snapshot().activity == Activity::Idle).await;

        inbound
            .send(ServerEvent::TranscriptionCompleted {
                transcript: "hello".to_string(),
            })
            .await
            .unwrap();
        wait_until(|| !fx.chat.appended.lock().is_empty()).await;
        assert_eq!(
            fx.chat.appended.lock().as_slice(),
            &[("sess-42".to_string(), "hello".to_string())]
        );
        assert_eq!(
            fx.controller.snapshot().last_transcript.as_deref(),
            Some("hello")
        );

        // The response streams back as two audio deltas.
        let delta = pcm::to_wire(&pcm::encode_frame(&[0.1f32; 240]));
        inbound
            .send(ServerEvent::AudioDelta {
                delta: delta.clone(),
            })
            .await
            .unwrap();
        inbound
            .send(ServerEvent::AudioDelta { delta })
            .await
            .unwrap();
        wait_until(|| fx.controller.snapshot().activity == Activity::Speaking).await;

        let first = chunks.recv().await.unwrap();
        let second = chunks.recv().await.unwrap();
        assert_eq!(&first.wav[0..4], b"RIFF");
        assert_eq!(&second.wav[0..4], b"RIFF");
        assert!(chunks.try_recv().is_err());

        inbound.send(ServerEvent::AudioDone).await.unwrap();
        wait_until(|| fx.controller.snapshot().activity == Activity::Idle).await;
        assert_eq!(
            fx.controller.snapshot().connection,
            ConnectionState::Connected
        );

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_dropped_session_continues() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();
        let inbound = fx.channel.inbound_sender();
        let mut chunks = fx.output.take_chunks();

        inbound
            .send(ServerEvent::AudioDelta {
                delta: "not!!base64".to_string(),
            })
            .await
            .unwrap();
        let valid = pcm::to_wire(&pcm::encode_frame(&[0.2f32; 120]));
        inbound
            .send(ServerEvent::AudioDelta { delta: valid })
            .await
            .unwrap();

        // Exactly one chunk reaches playback; the session stays connected.
        let chunk = tokio::time::timeout(Duration::from_secs(1), chunks.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&chunk.wav[0..4], b"RIFF");
        assert!(chunks.try_recv().is_err());
        assert_eq!(
            fx.controller.snapshot().connection,
            ConnectionState::Connected
        );

        fx.controller.disconnect().await;
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();

        let frames = fx.capture.frames_sender();
        fx.controller.disconnect().await;

        let snapshot = fx.controller.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
        assert_eq!(snapshot.activity, Activity::Idle);
        assert!(snapshot.last_transcript.is_none());
        // The capture handle is gone: its frame channel is closed.
        assert!(frames.is_closed());

        // A second disconnect is a quiet no-op.
        fx.controller.disconnect().await;
        assert_eq!(
            fx.controller.snapshot().connection,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_channel_error_runs_the_same_cleanup() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();
        let mut events = fx.controller.subscribe();
        let frames = fx.capture.frames_sender();

        // Peer vanishes: inbound closes, the loop tears the session down.
        fx.channel.drop_inbound();
        wait_until(|| {
            fx.controller.snapshot().connection == ConnectionState::Disconnected
        })
        .await;
        assert!(frames.is_closed());

        // The caller was notified.
        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::ChannelError { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);

        // Disconnect after the error is still safe.
        fx.controller.disconnect().await;
        assert_eq!(
            fx.controller.snapshot().connection,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_activity_resets_when_connection_drops() {
        let fx = fixture();
        fx.controller.connect("sess-1".to_string()).await.unwrap();
        let inbound = fx.channel.inbound_sender();

        inbound.send(ServerEvent::SpeechStarted).await.unwrap();
        wait_until(|| fx.controller.snapshot().activity == Activity::Listening).await;

        fx.controller.disconnect().await;
        let snapshot = fx.controller.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
        assert_eq!(snapshot.activity, Activity::Idle);
    }
}
