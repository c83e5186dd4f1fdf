//! Audio pipeline facade
//!
//! High-level control of the sampling core's processing pipeline over the
//! cross-core channel: configure/start, stop (with the mandatory DMA
//! settle delay), rate and buffer queries, and the gain/noise-reduction
//! switches. Also implements [`SamplingControl`] so the safe-write guard
//! can pause sampling around storage I/O.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::audio::channel::{
    ChannelError, CrossCoreChannel, DecoderId, FifoPort, PipelineCommand, PipelineConfig,
};
use crate::config::PIPELINE_STOP_SETTLE_MS;
use crate::store::guard::SamplingControl;

/// Control facade over the sampling core
pub struct AudioPipeline<F: FifoPort, D: DelayNs> {
    channel: CrossCoreChannel<F>,
    delay: D,
    active: Option<PipelineConfig>,
    resume: Option<PipelineConfig>,
}

impl<F: FifoPort, D: DelayNs> AudioPipeline<F, D> {
    /// Build the facade over a FIFO port and a delay provider
    pub fn new(fifo: F, delay: D) -> Self {
        Self {
            channel: CrossCoreChannel::new(fifo),
            delay,
            active: None,
            resume: None,
        }
    }

    /// Configure the pipeline and start sampling
    pub fn configure(&mut self, config: PipelineConfig) -> Result<(), ChannelError> {
        debug!(
            "pipeline: configure decoder {:?}, {} samples, {} Hz",
            config.decoder, config.sample_count, config.bandwidth_hz
        );
        self.channel.request_ack(&PipelineCommand::Configure(config))?;
        self.active = Some(config);
        Ok(())
    }

    /// Stop sampling.
    ///
    /// After the acknowledgement a fixed settle delay lets the in-flight
    /// DMA teardown complete on the other core before any new configure;
    /// this is deliberately a fixed delay, not a polled handshake.
    pub fn stop(&mut self) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::Stop)?;
        self.delay.delay_ms(PIPELINE_STOP_SETTLE_MS);
        self.active = None;
        Ok(())
    }

    /// Effective sampling rate in Hz
    pub fn sampling_rate(&mut self) -> Result<u32, ChannelError> {
        self.channel.request_word(&PipelineCommand::QuerySamplingRate)
    }

    /// Index of the buffer the sampling core is currently filling
    pub fn active_buffer_index(&mut self) -> Result<u32, ChannelError> {
        self.channel.request_word(&PipelineCommand::QueryActiveBuffer)
    }

    /// Enable/disable the audio processor AGC
    pub fn set_agc_enabled(&mut self, enabled: bool) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::SetAgcEnabled(enabled))
    }

    /// Enable/disable noise reduction
    pub fn set_noise_reduction(&mut self, enabled: bool) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::SetNoiseReduction(enabled))
    }

    /// Set the number of smoothing points
    pub fn set_smoothing_points(&mut self, points: u32) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::SetSmoothingPoints(points))
    }

    /// Set the manual gain factor
    pub fn set_manual_gain(&mut self, gain: f32) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::SetManualGain(gain))
    }

    /// Select blocking or non-blocking DMA mode
    pub fn set_blocking_dma(&mut self, blocking: bool) -> Result<(), ChannelError> {
        self.channel.request_ack(&PipelineCommand::SetBlockingDma(blocking))
    }

    /// Decoder currently active, `None` while stopped
    #[must_use]
    pub fn active_decoder(&self) -> DecoderId {
        self.active.map_or(DecoderId::None, |c| c.decoder)
    }

    /// Access the underlying FIFO port, used by diagnostics and tests
    pub fn port_mut(&mut self) -> &mut F {
        self.channel.port_mut()
    }
}

impl<F: FifoPort, D: DelayNs> SamplingControl for AudioPipeline<F, D> {
    fn is_sampling(&self) -> bool {
        self.active.is_some()
    }

    fn stop_sampling(&mut self) {
        if let Some(config) = self.active {
            self.resume = Some(config);
            if self.stop().is_err() {
                // Not confirmed; the guard still proceeds, the pipeline
                // will be reconfigured on resume either way
                warn!("pipeline: stop not confirmed before storage write");
            }
        }
    }

    fn start_sampling(&mut self) {
        if let Some(config) = self.resume.take() {
            if self.configure(config).is_err() {
                warn!("pipeline: restart not confirmed after storage write");
            }
        }
    }
}
