//! Tests for the cross-core channel and the pipeline facade
//!
//! Wire framing, float bit-pattern transport, desync recovery and the
//! post-stop settle delay.

use si4735_firmware::audio::channel::{
    ChannelError, CrossCoreChannel, DecoderId, FifoPort, PipelineCommand, PipelineConfig,
};
use si4735_firmware::audio::pipeline::AudioPipeline;
use si4735_firmware::sim::{SimDelay, SimFifo};
use si4735_firmware::store::guard::{SafeWriteGuard, SamplingControl};

fn test_config() -> PipelineConfig {
    PipelineConfig {
        decoder: DecoderId::Rtty,
        sample_count: 512,
        bandwidth_hz: 1200,
        cw_center_hz: 850,
        rtty_mark_hz: 1000,
        rtty_space_hz: 830,
        rtty_baud: 45.45,
    }
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn configure_serializes_in_wire_order() {
    let mut fifo = SimFifo::new();
    fifo.script(100); // ACK

    let mut channel = CrossCoreChannel::new(fifo);
    channel
        .request_ack(&PipelineCommand::Configure(test_config()))
        .unwrap();

    assert_eq!(
        channel.port_mut().sent,
        vec![
            1, // SET_CONFIG
            2, // decoder id
            512,
            1200,
            850,
            1000,
            830,
            45.45_f32.to_bits(),
        ]
    );
}

#[test]
fn manual_gain_crosses_as_a_raw_bit_pattern() {
    let mut fifo = SimFifo::new();
    fifo.script(100);

    let mut channel = CrossCoreChannel::new(fifo);
    channel
        .request_ack(&PipelineCommand::SetManualGain(2.5))
        .unwrap();

    assert_eq!(channel.port_mut().sent, vec![8, 2.5_f32.to_bits()]);
}

#[test]
fn boolean_commands_send_one_payload_word() {
    let mut fifo = SimFifo::new();
    fifo.script(100);
    fifo.script(100);

    let mut channel = CrossCoreChannel::new(fifo);
    channel.request_ack(&PipelineCommand::SetAgcEnabled(true)).unwrap();
    channel.request_ack(&PipelineCommand::SetNoiseReduction(false)).unwrap();

    assert_eq!(channel.port_mut().sent, vec![5, 1, 6, 0]);
}

#[test]
fn queries_return_the_typed_payload() {
    let mut fifo = SimFifo::new();
    fifo.script(101); // SAMPLING_RATE
    fifo.script(48_000);

    let mut channel = CrossCoreChannel::new(fifo);
    let rate = channel.request_word(&PipelineCommand::QuerySamplingRate).unwrap();
    assert_eq!(rate, 48_000);
    assert_eq!(channel.port_mut().sent, vec![3]);
}

// ============================================================================
// Desync recovery
// ============================================================================

#[test]
fn unexpected_response_drains_the_fifo_and_reports_desync() {
    let mut fifo = SimFifo::new();
    // Wrong response code followed by stale payload words
    fifo.script(102);
    fifo.script(7);
    fifo.script(9);

    let mut channel = CrossCoreChannel::new(fifo);
    let result = channel.request_word(&PipelineCommand::QuerySamplingRate);

    assert_eq!(
        result,
        Err(ChannelError::Desync {
            expected: 101,
            got: 102
        })
    );
    assert!(
        !channel.port_mut().available(),
        "stale words must not corrupt the next request's framing"
    );
}

#[test]
fn ack_commands_detect_desync_too() {
    let mut fifo = SimFifo::new();
    fifo.script(55);

    let mut channel = CrossCoreChannel::new(fifo);
    assert!(channel.request_ack(&PipelineCommand::Stop).is_err());
}

#[test]
fn the_channel_recovers_after_a_drain() {
    let mut fifo = SimFifo::new();
    fifo.script(55); // garbage for the first request
    let mut channel = CrossCoreChannel::new(fifo);

    assert!(channel.request_ack(&PipelineCommand::Stop).is_err());

    channel.port_mut().script(101);
    channel.port_mut().script(32_000);
    let rate = channel.request_word(&PipelineCommand::QuerySamplingRate).unwrap();
    assert_eq!(rate, 32_000);
}

// ============================================================================
// Pipeline facade
// ============================================================================

#[test]
fn stop_waits_out_the_dma_settle_time() {
    let mut fifo = SimFifo::new();
    fifo.script(100); // configure ACK
    fifo.script(100); // stop ACK

    let delay = SimDelay::default();
    let delay_handle = delay.clone();
    let mut pipeline = AudioPipeline::new(fifo, delay);

    pipeline.configure(test_config()).unwrap();
    assert_eq!(delay_handle.total_ns(), 0);

    pipeline.stop().unwrap();

    // 20 ms settle after the stop acknowledgement
    assert_eq!(delay_handle.total_ns(), 20_000_000);
    assert_eq!(pipeline.active_decoder(), DecoderId::None);
}

#[test]
fn pipeline_tracks_the_active_decoder() {
    let mut fifo = SimFifo::new();
    fifo.script(100);

    let mut pipeline = AudioPipeline::new(fifo, SimDelay::default());
    assert_eq!(pipeline.active_decoder(), DecoderId::None);
    assert!(!pipeline.is_sampling());

    pipeline.configure(test_config()).unwrap();
    assert_eq!(pipeline.active_decoder(), DecoderId::Rtty);
    assert!(pipeline.is_sampling());
}

#[test]
fn safe_write_guard_pauses_and_restores_the_pipeline() {
    let mut fifo = SimFifo::new();
    fifo.script(100); // configure ACK
    fifo.script(100); // stop ACK (guard entry)
    fifo.script(100); // re-configure ACK (guard exit)

    let mut pipeline = AudioPipeline::new(fifo, SimDelay::default());
    pipeline.configure(test_config()).unwrap();

    {
        let _guard = SafeWriteGuard::new(&mut pipeline);
    }

    assert!(pipeline.is_sampling(), "sampling resumes after the guard");
    assert_eq!(pipeline.active_decoder(), DecoderId::Rtty);

    // Wire traffic: configure, stop, configure again
    let sent = pipeline.port_mut().sent.clone();
    assert_eq!(sent[0], 1);
    assert_eq!(sent[8], 2); // STOP after the 8-word configure
    assert_eq!(sent[9], 1); // SET_CONFIG again
}

#[test]
fn an_idle_pipeline_is_not_touched_by_the_guard() {
    let fifo = SimFifo::new();
    let mut pipeline = AudioPipeline::new(fifo, SimDelay::default());

    {
        let _guard = SafeWriteGuard::new(&mut pipeline);
    }

    assert!(!pipeline.is_sampling());
    assert!(pipeline.port_mut().sent.is_empty());
}
