//! Speech session manager for the system backend
//!
//! At most one engine process is active per service. `speak` stops the
//! previous utterance and spawns the next one while holding the session lock,
//! then hands the child to a detached waiter task. The waiter never holds the
//! lock while the engine runs; it only takes it on exit to clear the session,
//! and only if the session still belongs to its own utterance.
//!
//! Cancellation goes through a per-utterance kill switch (a oneshot channel).
//! `stop` flips it and waits for the waiter to force-kill the process and
//! report back.

use super::command::{CommandBuilder, Platform, PlatformCommandBuilder};
use super::sanitize::{sanitize, ELLIPSIS, EMPTY_TEXT_MESSAGE, MAX_TEXT_CHARS};
use super::voices::list_voices;
use super::{SpeechResult, TtsService};
use crate::config::SpeechConfig;
use crate::{Result, TtsError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Child;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

type KillAck = oneshot::Sender<std::io::Result<()>>;

/// Ownership of the running engine process
struct ProcessHandle {
    utterance: u64,
    pid: Option<u32>,
    kill_switch: oneshot::Sender<KillAck>,
}

#[derive(Default)]
struct SessionState {
    speaking: bool,
    active: Option<ProcessHandle>,
}

/// System TTS: drives the host's speech engine as an external process
pub struct SystemTtsService {
    platform: Platform,
    builder: Arc<dyn CommandBuilder>,
    state: Arc<Mutex<SessionState>>,
    next_utterance: AtomicU64,
}

impl SystemTtsService {
    /// Service for the running host, engines resolved on `PATH`
    pub fn new() -> Self {
        let builder = PlatformCommandBuilder::detect();
        let platform = builder.platform().clone();
        Self::with_builder(platform, Arc::new(builder))
    }

    pub fn with_builder(platform: Platform, builder: Arc<dyn CommandBuilder>) -> Self {
        info!(target: "tts", platform = %platform, "System TTS service created");
        Self {
            platform,
            builder,
            state: Arc::new(Mutex::new(SessionState::default())),
            next_utterance: AtomicU64::new(1),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl Default for SystemTtsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsService for SystemTtsService {
    fn backend_name(&self) -> &'static str {
        "system"
    }

    async fn speak(&self, text: &str, config: SpeechConfig) -> Result<SpeechResult> {
        if text.trim().is_empty() {
            return Ok(SpeechResult::failed(EMPTY_TEXT_MESSAGE));
        }
        if text.chars().count() > MAX_TEXT_CHARS + ELLIPSIS.len() {
            return Ok(SpeechResult::failed(format!(
                "text too long (max {} characters)",
                MAX_TEXT_CHARS
            )));
        }

        let text = sanitize(text)?;
        let config = config.normalized();
        let started = Instant::now();

        // Held across stop-then-spawn so two utterances can never overlap
        let mut state = self.state.lock().await;
        if let Some(previous) = state.active.take() {
            state.speaking = false;
            debug!(target: "tts", utterance = previous.utterance, "Interrupting previous utterance");
            if let Err(e) = terminate(previous).await {
                warn!(target: "tts", error = %e, "Failed to stop previous utterance");
            }
        }

        let invocation = self.builder.build(&text, &config)?;
        debug!(target: "tts", command = %invocation, "Launching TTS engine");

        let child = invocation.to_command().spawn().map_err(|e| {
            error!(target: "tts", engine = %invocation.program, error = %e, "Failed to spawn TTS engine");
            TtsError::ProcessExecution(format!("{}: {}", invocation.program, e))
        })?;

        let utterance = self.next_utterance.fetch_add(1, Ordering::Relaxed);
        let pid = child.id();
        let (kill_switch, kill_rx) = oneshot::channel();
        state.active = Some(ProcessHandle {
            utterance,
            pid,
            kill_switch,
        });
        state.speaking = true;
        drop(state);

        info!(
            target: "tts",
            utterance,
            pid = ?pid,
            engine = %invocation.program,
            language = %config.language,
            "Speaking"
        );

        tokio::spawn(wait_for_exit(
            Arc::clone(&self.state),
            utterance,
            invocation.program,
            child,
            kill_rx,
        ));

        Ok(SpeechResult::succeeded(started.elapsed()))
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(handle) = state.active.take() else {
            state.speaking = false;
            return Ok(());
        };

        let utterance = handle.utterance;
        let pid = handle.pid;
        // Cleared before the await: if this future is dropped mid-kill, the
        // waiter no longer owns the session and would leave the flag set.
        state.speaking = false;
        let result = terminate(handle).await;

        match &result {
            Ok(()) => info!(target: "tts", utterance, pid = ?pid, "Speech stopped"),
            Err(e) => error!(target: "tts", utterance, pid = ?pid, error = %e, "Failed to stop speech"),
        }
        result
    }

    async fn voices(&self) -> Result<Vec<String>> {
        list_voices(&self.platform).await
    }

    async fn is_speaking(&self) -> bool {
        self.state.lock().await.speaking
    }
}

/// Flip the kill switch and wait for the waiter's verdict
async fn terminate(handle: ProcessHandle) -> Result<()> {
    let (ack_tx, ack_rx) = oneshot::channel();
    if handle.kill_switch.send(ack_tx).is_err() {
        // Waiter already saw the process exit
        return Ok(());
    }
    match ack_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TtsError::Stop(e.to_string())),
        Err(_) => Ok(()),
    }
}

async fn wait_for_exit(
    state: Arc<Mutex<SessionState>>,
    utterance: u64,
    engine: String,
    mut child: Child,
    mut kill_switch: oneshot::Receiver<KillAck>,
) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                debug!(target: "tts", utterance, engine = %engine, "Utterance finished");
            }
            Ok(status) => {
                warn!(target: "tts", utterance, engine = %engine, status = %status, "TTS engine exited with failure");
            }
            Err(e) => {
                warn!(target: "tts", utterance, engine = %engine, error = %e, "Failed to wait on TTS engine");
            }
        },
        Ok(ack) = &mut kill_switch => {
            let killed = child.kill().await;
            let _ = ack.send(killed);
        }
    }

    // Close the switch before locking: a stop() holding the lock then sees a
    // closed channel instead of waiting on this task.
    drop(kill_switch);

    let mut state = state.lock().await;
    if state.active.as_ref().map(|h| h.utterance) == Some(utterance) {
        state.active = None;
        state.speaking = false;
    }
}
