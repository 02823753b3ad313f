//! Routes inbound bus signals to the session.

use crate::error::Result;
use crate::hook::HookRunner;
use crate::runtime::AudioBackend;
use crate::session::{Session, Transition};
use q6voiced_protocol::{classify_signal, CallEvent, CallState, SignalKind};

/// The parts of a bus message the dispatcher inspects.
pub trait InboundSignal {
    fn interface(&self) -> Option<String>;
    fn member(&self) -> Option<String>;
    /// Decodes the leading `(int32 old, int32 new)` of a StateChanged body.
    fn state_pair(&self) -> Result<(i32, i32)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    StateChanged(Transition),
    CallAdded,
    Ignored,
}

pub fn decode<S: InboundSignal>(signal: &S) -> Result<Option<CallEvent>> {
    let interface = signal.interface();
    let member = signal.member();
    let kind = match classify_signal(interface.as_deref(), member.as_deref()) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let event = match kind {
        SignalKind::StateChanged => {
            let (old, new) = signal.state_pair()?;
            CallEvent::StateChanged {
                old: CallState::from(old),
                new: CallState::from(new),
            }
        }
        SignalKind::CallAdded => CallEvent::CallAdded,
    };
    Ok(Some(event))
}

pub fn dispatch<S, H, B>(session: &mut Session<H, B>, signal: &S) -> Result<Outcome>
where
    S: InboundSignal,
    H: HookRunner,
    B: AudioBackend,
{
    let event = match decode(signal)? {
        Some(event) => event,
        None => {
            tracing::trace!(
                interface = ?signal.interface(),
                member = ?signal.member(),
                "Ignoring bus message"
            );
            return Ok(Outcome::Ignored);
        }
    };

    match event {
        CallEvent::StateChanged { old, new } => {
            let transition = session.on_state_changed(old, new)?;
            Ok(Outcome::StateChanged(transition))
        }
        CallEvent::CallAdded => {
            tracing::debug!("Call added");
            session.on_call_added()?;
            Ok(Outcome::CallAdded)
        }
    }
}
