//! Pipeline driver: spawns and manages the per-connection processing task.
//!
//! One task owns the whole chain for a connection (byte source, stream
//! reassembler, policy filter, packet decoders and the skill matcher), so
//! buffer mutation, extraction and state-table updates are serialized
//! without locks. Nothing in the task blocks on I/O besides the source
//! itself, and timeouts are wall-clock comparisons on event timestamps,
//! not timers.
//!
//! Delivery is split by contract:
//! - resolved records go over a **bounded** mpsc channel; a slow consumer
//!   backpressures the pipeline, and dropping the receiver shuts it down
//! - formatted log lines and decoded events go over broadcast channels,
//!   best-effort with no backpressure

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::correlate::{SkillMatcher, SkillSignal, SkillTracker};
use crate::decode::decode_frame;
use crate::policy::{FramePolicy, StaticPolicy};
use crate::source::ByteSource;
use crate::types::{CombatEvent, EventBody, ResolvedDamage};
use crate::wire::StreamReassembler;

/// Tuning knobs for a spawned pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Capacity of the bounded resolved-record channel.
    pub record_capacity: usize,
    /// Capacity of the best-effort line/event broadcast channels.
    pub broadcast_capacity: usize,
    /// Reassembly buffer hard cap in bytes.
    pub max_buffer: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            record_capacity: 256,
            broadcast_capacity: 256,
            max_buffer: crate::wire::MAX_BUFFER_LEN,
        }
    }
}

/// Result of spawning a pipeline.
pub struct PipelineChannels {
    /// Receiver for resolved damage records. Keep it alive: dropping it
    /// terminates the pipeline once the next record is produced.
    pub records: mpsc::Receiver<ResolvedDamage>,
    /// Receiver for formatted sink lines (best-effort).
    pub lines: broadcast::Receiver<String>,
    /// Receiver for every decoded event, including hp changes that carry
    /// no attacker and so never become records (best-effort).
    pub events: broadcast::Receiver<CombatEvent>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

impl PipelineChannels {
    /// Consume the channels, keeping only the record receiver as a
    /// `Stream`, ready for combinators such as
    /// [`MeterExt::meter`](crate::stream::MeterExt::meter). The broadcast
    /// receivers are dropped; their sends are best-effort and simply go
    /// nowhere.
    pub fn into_record_stream(self) -> tokio_stream::wrappers::ReceiverStream<ResolvedDamage> {
        tokio_stream::wrappers::ReceiverStream::new(self.records)
    }
}

/// Pipeline spawns and manages combat-wire processing tasks.
pub struct Pipeline;

impl Pipeline {
    /// Spawn with the default matcher, policy and options.
    pub fn spawn<S>(source: S) -> PipelineChannels
    where
        S: ByteSource,
    {
        Self::spawn_with(source, SkillTracker::new(), StaticPolicy::default(), PipelineOptions::default())
    }

    /// Spawn with a custom matching policy, admission policy and options.
    pub fn spawn_with<S, M, P>(
        source: S,
        matcher: M,
        policy: P,
        options: PipelineOptions,
    ) -> PipelineChannels
    where
        S: ByteSource,
        M: SkillMatcher,
        P: FramePolicy,
    {
        let (record_tx, record_rx) = mpsc::channel(options.record_capacity);
        let (line_tx, line_rx) = broadcast::channel(options.broadcast_capacity);
        let (event_tx, event_rx) = broadcast::channel(options.broadcast_capacity);

        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            run(source, matcher, policy, options, record_tx, line_tx, event_tx, cancel_task).await;
        });

        PipelineChannels { records: record_rx, lines: line_rx, events: event_rx, cancel }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run<S, M, P>(
    mut source: S,
    mut matcher: M,
    policy: P,
    options: PipelineOptions,
    record_tx: mpsc::Sender<ResolvedDamage>,
    line_tx: broadcast::Sender<String>,
    event_tx: broadcast::Sender<CombatEvent>,
    cancel: CancellationToken,
) where
    S: ByteSource,
    M: SkillMatcher,
    P: FramePolicy,
{
    info!("pipeline task started");
    let mut reassembler = StreamReassembler::with_max_buffer(options.max_buffer);
    let mut chunk_count = 0u64;
    let mut record_count = 0u64;
    let mut error_count = 0u32;
    let mut latest_ms = 0u64;
    const MAX_ERRORS: u32 = 10;

    loop {
        if cancel.is_cancelled() {
            info!("pipeline cancelled");
            break;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("pipeline cancelled during read");
                break;
            }
            result = source.next_chunk() => result,
        };

        match result {
            Ok(Some(chunk)) => {
                chunk_count += 1;
                error_count = 0;
                latest_ms = latest_ms.max(chunk.observed_at_ms);

                let frames = reassembler.push(&chunk.payload, chunk.observed_at_ms);
                trace!(
                    chunk = chunk_count,
                    bytes = chunk.payload.len(),
                    frames = frames.len(),
                    buffered = reassembler.buffered(),
                    "chunk processed"
                );

                for frame in frames {
                    if policy.should_exclude(frame.frame_type, frame.declared_len, frame.encoding)
                    {
                        trace!(frame_type = frame.frame_type, "frame excluded by policy");
                        continue;
                    }

                    let Some(decoded) = decode_frame(frame.frame_type, &frame.payload) else {
                        continue;
                    };
                    let mut body = match decoded {
                        Ok(body) => body,
                        Err(e) => {
                            // One malformed decode never stops the batch.
                            warn!(frame_type = frame.frame_type, error = %e, "frame decode failed, skipping");
                            continue;
                        }
                    };

                    let at_ms = frame.observed_at_ms;
                    match &mut body {
                        EventBody::SkillInfo(info) => {
                            matcher.enqueue_skill(SkillSignal::from(&*info), at_ms);
                        }
                        EventBody::SkillAction(action) => {
                            matcher.enqueue_skill(SkillSignal::from(&*action), at_ms);
                        }
                        EventBody::SkillState(state) => {
                            matcher.note_state(state, at_ms);
                        }
                        EventBody::SkillDamage(damage) => {
                            if let Some(name) = matcher.match_damage(damage, at_ms) {
                                damage.skill_name = name;
                            }
                            let record = ResolvedDamage::from_damage(damage, at_ms);
                            let _ = line_tx.send(record.to_log_line());
                            if record_tx.send(record).await.is_err() {
                                debug!("record receiver dropped, shutting down");
                                return;
                            }
                            record_count += 1;
                        }
                        EventBody::ChangeHp(hp) => {
                            trace!(target = %hp.target, delta = hp.damage(), "hp change observed");
                        }
                    }

                    let _ = event_tx.send(CombatEvent {
                        body,
                        sequence: frame.sequence,
                        observed_at_ms: at_ms,
                    });
                }

                // One sweep per batch bounds state growth for skills that
                // never receive a terminating signal.
                matcher.cleanup(latest_ms);
            }
            Ok(None) => {
                info!(
                    "byte source ended after {} chunks, {} records",
                    chunk_count, record_count
                );
                break;
            }
            Err(e) => {
                error_count += 1;
                error!("source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                if error_count >= MAX_ERRORS {
                    error!("too many source errors, shutting down");
                    break;
                }

                // Exponential backoff: 50ms, 100ms, 200ms, ...
                let backoff =
                    std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                tokio::time::sleep(backoff).await;
            }
        }
    }

    info!("pipeline task ended ({} chunks, {} records)", chunk_count, record_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::ActorId;
    use crate::wire::{Encoding, FrameHeader};
    use std::time::Duration;

    fn frame_bytes(frame_type: i32, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader {
            frame_type,
            length: payload.len() as i32,
            encoding: Encoding::Raw,
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn skill_damage_payload(used_by: &str, target: &str, damage: u32, flags: [u8; 6]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&ActorId::from_hex(used_by).unwrap().as_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&ActorId::from_hex(target).unwrap().as_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&damage.to_le_bytes());
        payload.extend_from_slice(&[0u8; 12]);
        payload.extend_from_slice(&flags);
        payload.extend_from_slice(&9i32.to_le_bytes());
        payload
    }

    #[tokio::test]
    async fn unmatched_damage_flows_through_with_synthesized_name() {
        let buffer = frame_bytes(
            crate::decode::frame_type::SKILL_DAMAGE,
            &skill_damage_payload("aaaa0001", "bbbb0002", 750, [0; 6]),
        );
        let source = MemorySource::from_buffers([buffer], 5_000);

        let mut channels = Pipeline::spawn(source);
        let record = tokio::time::timeout(Duration::from_secs(2), channels.records.recv())
            .await
            .expect("timed out waiting for record")
            .expect("record channel closed early");

        assert_eq!(record.skill_name, "UNKNOWN");
        assert_eq!(record.damage, 750);
        assert_eq!(record.at_ms, 5_000);

        let line = channels.lines.recv().await.unwrap();
        assert!(line.starts_with("5000|aaaa0001|bbbb0002|UNKNOWN|750|"));
    }

    #[tokio::test]
    async fn transient_source_errors_are_retried_with_backoff() {
        use crate::error::CombatError;
        use crate::source::Chunk;

        // Fails twice, then delivers one damage frame, then ends.
        struct FlakySource {
            failures_left: u32,
            chunk: Option<Chunk>,
        }

        #[async_trait::async_trait]
        impl crate::source::ByteSource for FlakySource {
            async fn next_chunk(&mut self) -> crate::error::Result<Option<Chunk>> {
                if self.failures_left > 0 {
                    self.failures_left -= 1;
                    return Err(CombatError::source_failed("transient capture hiccup"));
                }
                Ok(self.chunk.take())
            }
        }

        let buffer = frame_bytes(
            crate::decode::frame_type::SKILL_DAMAGE,
            &skill_damage_payload("aaaa0001", "bbbb0002", 64, [0; 6]),
        );
        let source = FlakySource {
            failures_left: 2,
            chunk: Some(Chunk { payload: buffer, sequence: 0, observed_at_ms: 1 }),
        };

        let mut channels = Pipeline::spawn(source);
        let record = tokio::time::timeout(Duration::from_secs(5), channels.records.recv())
            .await
            .expect("timed out waiting for record")
            .expect("record channel closed early");
        assert_eq!(record.damage, 64);
    }

    #[tokio::test]
    async fn cancellation_stops_a_pipeline() {
        // A source that never ends: empty memory source returns None
        // immediately, so use cancel before polling instead.
        let source = MemorySource::default();
        let channels = Pipeline::spawn(source);
        channels.cancel.cancel();
        // The task ends; the record channel closes.
        let mut records = channels.records;
        assert!(records.recv().await.is_none());
    }
}
