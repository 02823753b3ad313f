//! Signal vocabulary and voice-session constants for q6voiced.
//!
//! Everything in this crate is pure: interface names, the ModemManager call
//! state table, the hook actions handed to the site script, and the fixed
//! telephony stream parameters. The daemon owns all I/O.

use std::fmt;

pub const CALL_INTERFACE: &str = "org.freedesktop.ModemManager1.Call";
pub const MODEM_VOICE_INTERFACE: &str = "org.freedesktop.ModemManager1.Modem.Voice";

pub const STATE_CHANGED_MEMBER: &str = "StateChanged";
pub const CALL_ADDED_MEMBER: &str = "CallAdded";

/// Interfaces the daemon subscribes to, one signal match rule each.
pub const SUBSCRIBED_INTERFACES: [&str; 2] = [CALL_INTERFACE, MODEM_VOICE_INTERFACE];

/// ModemManager `MMCallState`.
///
/// Values outside the known table are kept in `Other` rather than rejected;
/// newer ModemManager releases may add states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Unknown,
    Dialing,
    RingingOut,
    RingingIn,
    Active,
    Held,
    Waiting,
    Terminated,
    Other(i32),
}

impl CallState {
    /// Whether the codec must be in voice-call mode for this state.
    ///
    /// Held and Waiting count as inactive.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            CallState::Dialing | CallState::RingingOut | CallState::Active
        )
    }

    pub fn as_raw(self) -> i32 {
        match self {
            CallState::Unknown => 0,
            CallState::Dialing => 1,
            CallState::RingingOut => 2,
            CallState::RingingIn => 3,
            CallState::Active => 4,
            CallState::Held => 5,
            CallState::Waiting => 6,
            CallState::Terminated => 7,
            CallState::Other(raw) => raw,
        }
    }
}

impl From<i32> for CallState {
    fn from(raw: i32) -> Self {
        match raw {
            0 => CallState::Unknown,
            1 => CallState::Dialing,
            2 => CallState::RingingOut,
            3 => CallState::RingingIn,
            4 => CallState::Active,
            5 => CallState::Held,
            6 => CallState::Waiting,
            7 => CallState::Terminated,
            other => CallState::Other(other),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Unknown => f.write_str("unknown"),
            CallState::Dialing => f.write_str("dialing"),
            CallState::RingingOut => f.write_str("ringing-out"),
            CallState::RingingIn => f.write_str("ringing-in"),
            CallState::Active => f.write_str("active"),
            CallState::Held => f.write_str("held"),
            CallState::Waiting => f.write_str("waiting"),
            CallState::Terminated => f.write_str("terminated"),
            CallState::Other(raw) => write!(f, "other({})", raw),
        }
    }
}

/// Free-function form used by the state tracker.
pub fn is_active(state: CallState) -> bool {
    state.is_active()
}

/// Which handler an inbound signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    StateChanged,
    CallAdded,
}

/// Maps an (interface, member) pair to the signal the daemon acts on.
///
/// Members are only matched within their own interface: a `CallAdded` on the
/// call interface is not a call-added signal.
pub fn classify_signal(interface: Option<&str>, member: Option<&str>) -> Option<SignalKind> {
    match (interface?, member?) {
        (CALL_INTERFACE, STATE_CHANGED_MEMBER) => Some(SignalKind::StateChanged),
        (MODEM_VOICE_INTERFACE, CALL_ADDED_MEMBER) => Some(SignalKind::CallAdded),
        _ => None,
    }
}

/// A decoded signal, ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    StateChanged { old: CallState, new: CallState },
    CallAdded,
}

/// Keyword passed as the single argument to the hook script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    VoiceStart,
    VoiceStop,
    CallAdded,
}

impl HookAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HookAction::VoiceStart => "voice-start",
            HookAction::VoiceStop => "voice-stop",
            HookAction::CallAdded => "call-added",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of one of the two codec streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Capture,
    Playback,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamDirection::Capture => f.write_str("capture"),
            StreamDirection::Playback => f.write_str("playback"),
        }
    }
}

/// Role of a loopback helper and the property flag that selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackRole {
    /// Virtual sink fed into the capture stream.
    Sink,
    /// Virtual source fed from the playback stream.
    Source,
}

impl LoopbackRole {
    pub fn props_arg(self) -> &'static str {
        match self {
            LoopbackRole::Sink => "--capture-props=media.class=Audio/Sink",
            LoopbackRole::Source => "--playback-props=media.class=Audio/Source",
        }
    }
}

impl fmt::Display for LoopbackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopbackRole::Sink => f.write_str("sink-loopback"),
            LoopbackRole::Source => f.write_str("source-loopback"),
        }
    }
}

/// Fixed PCM parameters for voice calls: 20 ms periods, 40 ms buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub channels: u32,
    pub rate: u32,
    pub period_size: u32,
    pub period_count: u32,
}

/// Samples are always signed 16-bit little-endian.
pub const VOICE_CALL_STREAM: StreamConfig = StreamConfig {
    channels: 1,
    rate: 8000,
    period_size: 160,
    period_count: 2,
};

impl StreamConfig {
    pub fn buffer_size(&self) -> u32 {
        self.period_size * self.period_count
    }

    pub fn period_millis(&self) -> u32 {
        self.period_size * 1000 / self.rate
    }
}
