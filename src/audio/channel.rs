//! Cross-core channel
//!
//! Synchronous, ordered, blocking request/response messaging to the audio
//! sampling core. Each command is a typed message serialized to a command
//! word plus zero or more 32-bit payload words over a FIFO primitive;
//! every request that expects a reply blocks for exactly one response
//! word (an acknowledgement, or a typed response code followed by its
//! payload). Floats cross the boundary as their raw bit pattern.
//!
//! On an unexpected response code the channel is drained of any queued
//! words before the failure is reported, so no stale word can corrupt the
//! framing of the next request.

use core::fmt;

use heapless::Vec;

use log::warn;

/// Blocking 32-bit word FIFO to the other core.
///
/// On the RP2040 this is the inter-core SIO FIFO; the simulation harness
/// scripts it for host tests.
pub trait FifoPort {
    /// Push one word, blocking until there is space
    fn push(&mut self, word: u32);

    /// Pop one word, blocking until one arrives
    fn pop(&mut self) -> u32;

    /// True while received words are pending
    fn available(&self) -> bool;
}

/// Command words understood by the sampling core
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandCode {
    /// Configure the pipeline and start sampling
    SetConfig = 1,
    /// Stop sampling and tear down DMA
    Stop = 2,
    /// Query the effective sampling rate
    GetSamplingRate = 3,
    /// Query the index of the buffer currently being filled
    GetDataBlock = 4,
    /// Enable/disable the audio processor AGC
    SetAgcEnabled = 5,
    /// Enable/disable noise reduction
    SetNoiseReductionEnabled = 6,
    /// Set the number of smoothing points
    SetSmoothingPoints = 7,
    /// Set the manual gain factor
    SetManualGain = 8,
    /// Select blocking or non-blocking DMA mode
    SetBlockingDmaMode = 9,
}

/// Response words sent back by the sampling core
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ResponseCode {
    /// Command acknowledged
    Ack = 100,
    /// Sampling rate response, one payload word follows
    SamplingRate = 101,
    /// Data block response, one payload word follows
    DataBlock = 102,
}

/// Decoder running on the sampling core
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum DecoderId {
    /// Sampling without a decoder
    #[default]
    None = 0,
    /// CW decoder
    Cw = 1,
    /// RTTY decoder
    Rtty = 2,
    /// SSTV decoder
    Sstv = 3,
    /// WeFax decoder
    Wefax = 4,
}

/// Pipeline configuration carried by [`PipelineCommand::Configure`].
///
/// The decoder-specific parameters ride along unconditionally; the other
/// core ignores whatever its selected decoder does not use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Decoder to activate
    pub decoder: DecoderId,
    /// Samples per processing block
    pub sample_count: u32,
    /// Audio bandwidth in Hz
    pub bandwidth_hz: u32,
    /// CW detection center frequency in Hz
    pub cw_center_hz: u32,
    /// RTTY mark frequency in Hz
    pub rtty_mark_hz: u32,
    /// RTTY space frequency in Hz
    pub rtty_space_hz: u32,
    /// RTTY baud rate
    pub rtty_baud: f32,
}

/// Typed command set of the cross-core protocol
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineCommand {
    /// Configure the pipeline and start sampling
    Configure(PipelineConfig),
    /// Stop sampling
    Stop,
    /// Query the effective sampling rate
    QuerySamplingRate,
    /// Query the active buffer index
    QueryActiveBuffer,
    /// Enable/disable the audio processor AGC
    SetAgcEnabled(bool),
    /// Enable/disable noise reduction
    SetNoiseReduction(bool),
    /// Set the number of smoothing points
    SetSmoothingPoints(u32),
    /// Set the manual gain factor
    SetManualGain(f32),
    /// Select blocking or non-blocking DMA mode
    SetBlockingDma(bool),
}

/// Maximum payload words of any command
pub const MAX_PAYLOAD_WORDS: usize = 7;

impl PipelineCommand {
    /// Wire command code
    #[must_use]
    pub const fn code(&self) -> CommandCode {
        match self {
            Self::Configure(_) => CommandCode::SetConfig,
            Self::Stop => CommandCode::Stop,
            Self::QuerySamplingRate => CommandCode::GetSamplingRate,
            Self::QueryActiveBuffer => CommandCode::GetDataBlock,
            Self::SetAgcEnabled(_) => CommandCode::SetAgcEnabled,
            Self::SetNoiseReduction(_) => CommandCode::SetNoiseReductionEnabled,
            Self::SetSmoothingPoints(_) => CommandCode::SetSmoothingPoints,
            Self::SetManualGain(_) => CommandCode::SetManualGain,
            Self::SetBlockingDma(_) => CommandCode::SetBlockingDmaMode,
        }
    }

    /// The response code this command blocks for
    #[must_use]
    pub const fn expected_response(&self) -> ResponseCode {
        match self {
            Self::QuerySamplingRate => ResponseCode::SamplingRate,
            Self::QueryActiveBuffer => ResponseCode::DataBlock,
            _ => ResponseCode::Ack,
        }
    }

    /// Serialize the payload words in wire order
    #[must_use]
    pub fn payload(&self) -> Vec<u32, MAX_PAYLOAD_WORDS> {
        let mut words = Vec::new();
        match *self {
            Self::Configure(cfg) => {
                let _ = words.push(cfg.decoder as u32);
                let _ = words.push(cfg.sample_count);
                let _ = words.push(cfg.bandwidth_hz);
                let _ = words.push(cfg.cw_center_hz);
                let _ = words.push(cfg.rtty_mark_hz);
                let _ = words.push(cfg.rtty_space_hz);
                let _ = words.push(cfg.rtty_baud.to_bits());
            }
            Self::SetAgcEnabled(on) | Self::SetNoiseReduction(on) | Self::SetBlockingDma(on) => {
                let _ = words.push(u32::from(on));
            }
            Self::SetSmoothingPoints(points) => {
                let _ = words.push(points);
            }
            Self::SetManualGain(gain) => {
                let _ = words.push(gain.to_bits());
            }
            Self::Stop | Self::QuerySamplingRate | Self::QueryActiveBuffer => {}
        }
        words
    }
}

/// Cross-core protocol failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The other core answered with an unexpected response code; the
    /// channel was drained and the operation must be treated as not
    /// confirmed, not retried blindly
    Desync {
        /// Response code that was expected
        expected: u32,
        /// Word actually received
        got: u32,
    },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desync { expected, got } => {
                write!(f, "cross-core desync: expected {expected}, got {got}")
            }
        }
    }
}

/// The synchronous request/response channel
pub struct CrossCoreChannel<F: FifoPort> {
    fifo: F,
}

impl<F: FifoPort> CrossCoreChannel<F> {
    /// Wrap a FIFO port
    pub fn new(fifo: F) -> Self {
        Self { fifo }
    }

    /// Issue a command that answers with a bare acknowledgement
    pub fn request_ack(&mut self, command: &PipelineCommand) -> Result<(), ChannelError> {
        self.send(command);
        self.expect(ResponseCode::Ack).map(|_| ())
    }

    /// Issue a command that answers with a typed response word followed by
    /// one payload word
    pub fn request_word(&mut self, command: &PipelineCommand) -> Result<u32, ChannelError> {
        self.send(command);
        self.expect(command.expected_response())?;
        Ok(self.fifo.pop())
    }

    fn send(&mut self, command: &PipelineCommand) {
        self.fifo.push(command.code() as u32);
        for word in command.payload() {
            self.fifo.push(word);
        }
    }

    fn expect(&mut self, response: ResponseCode) -> Result<u32, ChannelError> {
        let got = self.fifo.pop();
        if got == response as u32 {
            Ok(got)
        } else {
            warn!("channel: expected response {}, got {}", response as u32, got);
            self.drain();
            Err(ChannelError::Desync {
                expected: response as u32,
                got,
            })
        }
    }

    /// Discard queued words so stale data cannot corrupt the next
    /// request's framing
    fn drain(&mut self) {
        while self.fifo.available() {
            let _ = self.fifo.pop();
        }
    }

    /// Access the port, used by tests
    pub fn port_mut(&mut self) -> &mut F {
        &mut self.fifo
    }
}
