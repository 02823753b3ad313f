//! Voice-call runtime: codec streams plus the loopback helpers that keep the
//! codec from suspending.
//!
//! ## Ordering
//!
//! ```text
//! create:  open capture → open playback → spawn sink loopback → spawn source loopback
//! destroy: join sink loopback → join source loopback → release capture → release playback
//! ```
//!
//! Helpers must stop touching the audio path before the streams go away, so
//! joins always complete before any release. A failed `create` unwinds what
//! it already acquired in the same order. If a helper cannot be joined the
//! streams are parked: neither released nor closed until the process exits.

use crate::error::{Result, VoicedError};
use crate::pcm::VoiceStream;
use crate::process::{self, ProcessSpec};
use q6voiced_protocol::{LoopbackRole, StreamDirection};
use std::path::PathBuf;
use std::process::Child;

/// Hardware and process primitives the runtime is built from.
pub trait AudioBackend {
    type Stream;
    type Helper;

    fn open_stream(&mut self, card: u32, device: u32, direction: StreamDirection)
        -> Result<Self::Stream>;
    fn release_stream(&mut self, stream: Self::Stream);
    fn spawn_helper(&mut self, role: LoopbackRole) -> Result<Self::Helper>;
    fn join_helper(&mut self, helper: Self::Helper) -> Result<()>;
}

/// Resources held for the duration of one voice session.
pub struct Runtime<B: AudioBackend> {
    capture: B::Stream,
    playback: B::Stream,
    sink_loopback: B::Helper,
    source_loopback: B::Helper,
}

pub struct RuntimeManager<B> {
    backend: B,
}

impl<B: AudioBackend> RuntimeManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn create(&mut self, card: u32, device: u32) -> Result<Runtime<B>> {
        let capture = self
            .backend
            .open_stream(card, device, StreamDirection::Capture)?;

        let playback = match self
            .backend
            .open_stream(card, device, StreamDirection::Playback)
        {
            Ok(stream) => stream,
            Err(err) => {
                self.backend.release_stream(capture);
                return Err(err);
            }
        };

        let sink_loopback = match self.backend.spawn_helper(LoopbackRole::Sink) {
            Ok(helper) => helper,
            Err(err) => {
                self.release_streams(capture, playback);
                return Err(err);
            }
        };

        let source_loopback = match self.backend.spawn_helper(LoopbackRole::Source) {
            Ok(helper) => helper,
            Err(err) => {
                if let Err(join_err) = self.backend.join_helper(sink_loopback) {
                    tracing::error!(error = %join_err, "Failed to join sink loopback during rollback");
                    self.park_streams(capture, playback);
                    return Err(err);
                }
                self.release_streams(capture, playback);
                return Err(err);
            }
        };

        Ok(Runtime {
            capture,
            playback,
            sink_loopback,
            source_loopback,
        })
    }

    pub fn destroy(&mut self, runtime: Runtime<B>) -> Result<()> {
        let Runtime {
            capture,
            playback,
            sink_loopback,
            source_loopback,
        } = runtime;

        let sink_result = self.backend.join_helper(sink_loopback);
        let source_result = self.backend.join_helper(source_loopback);
        if let Err(err) = sink_result.and(source_result) {
            self.park_streams(capture, playback);
            return Err(err);
        }

        self.release_streams(capture, playback);
        Ok(())
    }

    /// Leaks the stream handles so they stay open until the process exits.
    ///
    /// Only used when a helper could not be joined and may still be reading or
    /// writing the codec.
    fn park_streams(&mut self, capture: B::Stream, playback: B::Stream) {
        tracing::warn!("Loopback helper not joined; voice streams stay open until exit");
        std::mem::forget(capture);
        std::mem::forget(playback);
    }

    fn release_streams(&mut self, capture: B::Stream, playback: B::Stream) {
        self.backend.release_stream(capture);
        self.backend.release_stream(playback);
    }
}

/// ALSA streams and pw-loopback helpers.
pub struct HardwareBackend {
    loopback_program: PathBuf,
}

pub struct LoopbackHelper {
    role: LoopbackRole,
    child: Child,
}

impl HardwareBackend {
    pub fn new(loopback_program: impl Into<PathBuf>) -> Self {
        Self {
            loopback_program: loopback_program.into(),
        }
    }
}

impl AudioBackend for HardwareBackend {
    type Stream = VoiceStream;
    type Helper = LoopbackHelper;

    fn open_stream(
        &mut self,
        card: u32,
        device: u32,
        direction: StreamDirection,
    ) -> Result<VoiceStream> {
        VoiceStream::open(card, device, direction)
    }

    fn release_stream(&mut self, stream: VoiceStream) {
        stream.release();
    }

    fn spawn_helper(&mut self, role: LoopbackRole) -> Result<LoopbackHelper> {
        let spec = ProcessSpec::new(&self.loopback_program)
            .arg(role.props_arg())
            .die_on_parent_exit();
        let child = process::spawn(&spec)?;
        tracing::debug!(%role, pid = child.id(), "Loopback helper started");
        Ok(LoopbackHelper { role, child })
    }

    fn join_helper(&mut self, mut helper: LoopbackHelper) -> Result<()> {
        let pid = helper.child.id();
        let status =
            process::terminate_and_wait(&mut helper.child).map_err(|source| {
                VoicedError::Terminate {
                    role: helper.role,
                    pid,
                    source,
                }
            })?;
        tracing::debug!(role = %helper.role, pid, status = %status, "Loopback helper joined");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared, ordered record of every side effect, across backend and hooks.
    pub type Journal = Rc<RefCell<Vec<String>>>;

    /// Records `closed` if dropped without going through `release_stream`.
    pub struct FakeStream {
        direction: StreamDirection,
        journal: Journal,
        released: bool,
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            if !self.released {
                self.journal
                    .borrow_mut()
                    .push(format!("closed {}", self.direction));
            }
        }
    }

    #[derive(Default)]
    pub struct FakeBackend {
        pub journal: Journal,
        pub fail_open: Option<StreamDirection>,
        pub fail_spawn: Option<LoopbackRole>,
        pub fail_join: Option<LoopbackRole>,
    }

    impl FakeBackend {
        pub fn with_journal(journal: Journal) -> Self {
            Self {
                journal,
                ..Self::default()
            }
        }

        fn record(&self, entry: String) {
            self.journal.borrow_mut().push(entry);
        }

        pub fn entries(&self) -> Vec<String> {
            self.journal.borrow().clone()
        }
    }

    impl AudioBackend for FakeBackend {
        type Stream = FakeStream;
        type Helper = LoopbackRole;

        fn open_stream(
            &mut self,
            card: u32,
            device: u32,
            direction: StreamDirection,
        ) -> Result<FakeStream> {
            if self.fail_open == Some(direction) {
                return Err(VoicedError::PcmNotReady {
                    direction,
                    state: "Open".to_string(),
                });
            }
            self.record(format!("open {} hw:{},{}", direction, card, device));
            Ok(FakeStream {
                direction,
                journal: self.journal.clone(),
                released: false,
            })
        }

        fn release_stream(&mut self, mut stream: FakeStream) {
            self.record(format!("release {}", stream.direction));
            stream.released = true;
        }

        fn spawn_helper(&mut self, role: LoopbackRole) -> Result<LoopbackRole> {
            if self.fail_spawn == Some(role) {
                return Err(VoicedError::Spawn {
                    program: "pw-loopback".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            self.record(format!("spawn {}", role));
            Ok(role)
        }

        fn join_helper(&mut self, role: LoopbackRole) -> Result<()> {
            if self.fail_join == Some(role) {
                return Err(VoicedError::Terminate {
                    role,
                    pid: 1,
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            self.record(format!("join {}", role));
            Ok(())
        }
    }
}
