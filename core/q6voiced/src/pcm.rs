//! ALSA codec streams in voice-call configuration.
//!
//! Opening and preparing the streams is what switches the DSP into its
//! voice path; nothing is ever read or written through them.

use crate::error::{Result, VoicedError};
use alsa::pcm::{Access, Format, HwParams, State, PCM};
use alsa::{Direction, ValueOr};
use q6voiced_protocol::{StreamConfig, StreamDirection, VOICE_CALL_STREAM};

pub struct VoiceStream {
    direction: StreamDirection,
    pcm: PCM,
}

impl VoiceStream {
    pub fn open(card: u32, device: u32, direction: StreamDirection) -> Result<Self> {
        let name = format!("hw:{},{}", card, device);
        let pcm = PCM::new(&name, alsa_direction(direction), false).map_err(|source| {
            VoicedError::PcmOpen {
                direction,
                card,
                device,
                source,
            }
        })?;

        apply_hw_params(&pcm, &VOICE_CALL_STREAM)
            .map_err(|source| VoicedError::PcmConfigure { direction, source })?;
        pcm.prepare()
            .map_err(|source| VoicedError::PcmPrepare { direction, source })?;

        let state = pcm.state();
        if state != State::Prepared {
            return Err(VoicedError::PcmNotReady {
                direction,
                state: format!("{:?}", state),
            });
        }

        tracing::debug!(
            %direction,
            device = %name,
            buffer_frames = VOICE_CALL_STREAM.buffer_size(),
            period_ms = VOICE_CALL_STREAM.period_millis(),
            "Voice stream prepared"
        );
        Ok(Self { direction, pcm })
    }

    /// Closes the stream; the handle is released when `self` drops.
    pub fn release(self) {
        if let Err(err) = self.pcm.drop() {
            tracing::warn!(direction = %self.direction, error = %err, "Failed to stop voice stream");
        }
        tracing::debug!(direction = %self.direction, "Voice stream released");
    }
}

fn alsa_direction(direction: StreamDirection) -> Direction {
    match direction {
        StreamDirection::Capture => Direction::Capture,
        StreamDirection::Playback => Direction::Playback,
    }
}

fn apply_hw_params(pcm: &PCM, config: &StreamConfig) -> alsa::Result<()> {
    let hwp = HwParams::any(pcm)?;
    hwp.set_access(Access::RWInterleaved)?;
    hwp.set_format(Format::S16LE)?;
    hwp.set_channels(config.channels)?;
    hwp.set_rate(config.rate, ValueOr::Nearest)?;
    hwp.set_period_size(config.period_size as alsa::pcm::Frames, ValueOr::Nearest)?;
    hwp.set_buffer_size_near(config.buffer_size() as alsa::pcm::Frames)?;
    pcm.hw_params(&hwp)
}
