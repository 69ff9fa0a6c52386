//! Windowed damage aggregation.
//!
//! Meter-style consumers want per-actor totals at a steady cadence, not a
//! record flood. [`MeterExt::meter`] folds a resolved-record stream into
//! fixed windows: each interval tick drains every record available so far
//! and emits one [`MeterFrame`] of per-actor totals, sorted by damage
//! descending. An idle window emits an empty frame, which is what lets a
//! display decay to zero.

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, interval};

use crate::types::{ActorId, ResolvedDamage};

/// Damage totals for one actor over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorTotals {
    pub actor: ActorId,
    pub total: u64,
    pub hits: u32,
    pub crits: u32,
    pub max_hit: u32,
}

/// One emitted aggregation window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MeterFrame {
    /// Per-actor totals, sorted by total damage descending.
    pub totals: Vec<ActorTotals>,
}

/// Extension trait to aggregate any resolved-record stream.
pub trait MeterExt: Stream<Item = ResolvedDamage> {
    /// Fold records into fixed windows of per-actor totals.
    fn meter(self, window: Duration) -> Meter<Self>
    where
        Self: Sized,
    {
        Meter::new(self, window)
    }
}

impl<T: Stream<Item = ResolvedDamage>> MeterExt for T {}

pin_project! {
    /// A stream combinator that emits one [`MeterFrame`] per window.
    pub struct Meter<S> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: HashMap<ActorId, ActorTotals>,
        exhausted: bool,
    }
}

impl<S: Stream<Item = ResolvedDamage>> Meter<S> {
    pub fn new(stream: S, window: Duration) -> Self {
        let mut interval = interval(window);
        // Fire at the window boundary after falling behind, not in bursts.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        Self { stream, interval, pending: HashMap::new(), exhausted: false }
    }
}

fn fold(pending: &mut HashMap<ActorId, ActorTotals>, record: &ResolvedDamage) {
    let totals = pending.entry(record.used_by).or_insert_with(|| ActorTotals {
        actor: record.used_by,
        total: 0,
        hits: 0,
        crits: 0,
        max_hit: 0,
    });
    totals.total += u64::from(record.damage);
    totals.hits += 1;
    if record.flags.crit() {
        totals.crits += 1;
    }
    totals.max_hit = totals.max_hit.max(record.damage);
}

fn flush(pending: &mut HashMap<ActorId, ActorTotals>) -> MeterFrame {
    let mut totals: Vec<ActorTotals> = pending.drain().map(|(_, t)| t).collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then(a.actor.cmp(&b.actor)));
    MeterFrame { totals }
}

impl<S: Stream<Item = ResolvedDamage>> Stream for Meter<S> {
    type Item = MeterFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.exhausted {
            return Poll::Ready(None);
        }

        ready!(this.interval.poll_tick(cx));

        // Drain everything available this window.
        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(record)) => {
                    fold(this.pending, &record);
                }
                Poll::Ready(None) => {
                    // Emit the final window, then end on the next poll.
                    *this.exhausted = true;
                    let frame = flush(this.pending);
                    return if frame.totals.is_empty() {
                        Poll::Ready(None)
                    } else {
                        Poll::Ready(Some(frame))
                    };
                }
                Poll::Pending => {
                    return Poll::Ready(Some(flush(this.pending)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DamageFlags, SkillDamage};
    use futures::StreamExt;

    fn record(used_by: &str, damage: u32, crit: bool) -> ResolvedDamage {
        let flags = DamageFlags::decode([if crit { 0x01 } else { 0x00 }, 0, 0, 0, 0, 0]);
        ResolvedDamage::from_damage(
            &SkillDamage {
                used_by: ActorId::from_hex(used_by).unwrap(),
                target: ActorId::from_hex("bbbb0002").unwrap(),
                damage,
                skill_id: 1,
                flags,
                skill_name: "Fireball".to_string(),
            },
            0,
        )
    }

    #[tokio::test]
    async fn folds_records_into_per_actor_totals() {
        let records = vec![
            record("aaaa0001", 100, false),
            record("aaaa0001", 300, true),
            record("cccc0003", 250, false),
        ];
        let mut meter = tokio_stream::iter(records).meter(Duration::from_millis(10));

        let frame = meter.next().await.expect("one window expected");
        assert_eq!(frame.totals.len(), 2);

        let top = &frame.totals[0];
        assert_eq!(top.actor.to_string(), "aaaa0001");
        assert_eq!(top.total, 400);
        assert_eq!(top.hits, 2);
        assert_eq!(top.crits, 1);
        assert_eq!(top.max_hit, 300);

        assert_eq!(frame.totals[1].total, 250);
    }

    #[tokio::test]
    async fn stream_ends_after_final_window() {
        let mut meter =
            tokio_stream::iter(vec![record("aaaa0001", 50, false)]).meter(Duration::from_millis(5));

        assert!(meter.next().await.is_some());
        assert!(meter.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_input_ends_without_frames() {
        let mut meter = tokio_stream::iter(Vec::<ResolvedDamage>::new())
            .meter(Duration::from_millis(5));
        assert!(meter.next().await.is_none());
    }

    #[tokio::test]
    async fn idle_windows_emit_empty_frames() {
        // A channel-backed stream that stays open but delivers nothing.
        let (tx, rx) = tokio::sync::mpsc::channel::<ResolvedDamage>(4);
        let mut meter =
            tokio_stream::wrappers::ReceiverStream::new(rx).meter(Duration::from_millis(5));

        let frame = meter.next().await.expect("idle window should emit");
        assert!(frame.totals.is_empty());
        drop(tx);
    }
}
