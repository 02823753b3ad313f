//! Voice session tracking.
//!
//! Call states collapse into two session states through
//! [`CallState::is_active`]:
//!
//! ```text
//! Idle      → InSession : hook voice-start, then create runtime
//! InSession → Idle      : destroy runtime, then hook voice-stop
//! ```
//!
//! Everything else (duplicate delivery, active→active, inactive→inactive) is
//! a no-op. Only one runtime is tracked; overlapping calls share it.

use crate::error::Result;
use crate::hook::HookRunner;
use crate::runtime::{AudioBackend, Runtime, RuntimeManager};
use q6voiced_protocol::{is_active, CallState, HookAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Duplicate,
    AlreadyInSession,
    NotInSession,
    NoSessionChange,
}

pub struct Session<H, B: AudioBackend> {
    card: u32,
    device: u32,
    hooks: H,
    runtimes: RuntimeManager<B>,
    runtime: Option<Runtime<B>>,
}

impl<H: HookRunner, B: AudioBackend> Session<H, B> {
    pub fn new(card: u32, device: u32, hooks: H, backend: B) -> Self {
        Self {
            card,
            device,
            hooks,
            runtimes: RuntimeManager::new(backend),
            runtime: None,
        }
    }

    pub fn in_session(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn on_state_changed(&mut self, old: CallState, new: CallState) -> Result<Transition> {
        tracing::debug!(
            old = %old,
            new = %new,
            old_raw = old.as_raw(),
            new_raw = new.as_raw(),
            "Call state changed"
        );

        if old == new {
            return Ok(Transition::Ignored(IgnoreReason::Duplicate));
        }

        if is_active(new) {
            if self.runtime.is_some() {
                return Ok(Transition::Ignored(IgnoreReason::AlreadyInSession));
            }
            self.open()?;
            return Ok(Transition::Opened);
        }

        if is_active(old) {
            if self.runtime.is_none() {
                return Ok(Transition::Ignored(IgnoreReason::NotInSession));
            }
            self.close()?;
            return Ok(Transition::Closed);
        }

        Ok(Transition::Ignored(IgnoreReason::NoSessionChange))
    }

    pub fn on_call_added(&mut self) -> Result<()> {
        self.hooks.run(HookAction::CallAdded)
    }

    /// Tears down a live runtime without running the voice-stop hook.
    ///
    /// Used when the event loop is exiting.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.runtime.take() {
            Some(runtime) => {
                tracing::info!("Releasing voice runtime on shutdown");
                self.runtimes.destroy(runtime)
            }
            None => Ok(()),
        }
    }

    fn open(&mut self) -> Result<()> {
        self.hooks.run(HookAction::VoiceStart)?;
        let runtime = self.runtimes.create(self.card, self.device)?;
        self.runtime = Some(runtime);
        tracing::info!(card = self.card, device = self.device, "Voice session opened");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(runtime) = self.runtime.take() {
            self.runtimes.destroy(runtime)?;
        }
        self.hooks.run(HookAction::VoiceStop)?;
        tracing::info!("Voice session closed");
        Ok(())
    }
}
