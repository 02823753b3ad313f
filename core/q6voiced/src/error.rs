//! Error types for q6voiced.
//!
//! Every variant is fatal to the daemon: the event loop tears down the live
//! runtime, logs the error and exits so the supervisor can restart it.

use q6voiced_protocol::{LoopbackRole, StreamDirection};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VoicedError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file malformed: {path}: {source}")]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Bus Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("D-Bus {context} failed: {source}")]
    Bus {
        context: &'static str,
        #[source]
        source: zbus::Error,
    },

    #[error("Malformed {member} signal: expected (int32, int32) body, got '{signature}'")]
    MalformedSignal { member: String, signature: String },

    // ─────────────────────────────────────────────────────────────────────
    // Hardware Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to open {direction} stream on hw:{card},{device}: {source}")]
    PcmOpen {
        direction: StreamDirection,
        card: u32,
        device: u32,
        #[source]
        source: alsa::Error,
    },

    #[error("Failed to apply voice-call hw params to {direction} stream: {source}")]
    PcmConfigure {
        direction: StreamDirection,
        #[source]
        source: alsa::Error,
    },

    #[error("Failed to prepare {direction} stream: {source}")]
    PcmPrepare {
        direction: StreamDirection,
        #[source]
        source: alsa::Error,
    },

    #[error("{direction} stream not ready after prepare (state {state})")]
    PcmNotReady {
        direction: StreamDirection,
        state: String,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to signal {role} helper (pid {pid}): {source}")]
    Terminate {
        role: LoopbackRole,
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, VoicedError>;

impl VoicedError {
    pub fn bus(context: &'static str) -> impl FnOnce(zbus::Error) -> Self {
        move |source| VoicedError::Bus { context, source }
    }
}
