//! Time-ordered automation event queue.
//!
//! The timeline is the single mechanism by which time-based parameter
//! changes reach any module, including the mixer. Events are drained at
//! block boundaries and applied at the start of the block whose interval
//! contains their timestamp, so automation timing is quantized to the
//! block size.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sequencing::TempoMap;

/// Tolerance applied when comparing event times against a block horizon.
///
/// Guards against floating-point accumulation over many block
/// boundaries; an event computed as `0.299999999` still fires with the
/// block that starts at `0.3`.
pub const TIME_EPSILON: f64 = 1e-9;

/// A scheduled parameter change expressed in absolute time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationEvent {
    /// Absolute time in seconds.
    pub time_seconds: f64,
    /// Target identifier (a module name, or a mixer address such as
    /// `channel:lead`).
    pub target: String,
    /// Parameter name on the target.
    pub parameter: String,
    /// New value; null only where the target accepts it.
    pub value: Option<f32>,
    /// Diagnostic tag describing who scheduled the event.
    pub source: String,
}

/// Heap entry: events order by time, ties by insertion sequence.
#[derive(Debug)]
struct Scheduled {
    event: AutomationEvent,
    seq: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.event.time_seconds == other.event.time_seconds
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Event times are finite by construction; treat any incomparable
        // pair as equal rather than panicking.
        self.event
            .time_seconds
            .partial_cmp(&other.event.time_seconds)
            .unwrap_or(Ordering::Equal)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-priority queue of automation events with stable tie ordering.
#[derive(Debug, Default)]
pub struct AutomationTimeline {
    heap: BinaryHeap<std::cmp::Reverse<Scheduled>>,
    next_seq: u64,
}

impl AutomationTimeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event onto the timeline.
    pub fn schedule(&mut self, event: AutomationEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(std::cmp::Reverse(Scheduled { event, seq }));
    }

    /// Convert a beat position to seconds via `tempo` and push.
    ///
    /// An empty `source` is replaced with a `beats@<n>` tag so the event
    /// stays traceable in diagnostics.
    pub fn schedule_in_beats(
        &mut self,
        target: impl Into<String>,
        parameter: impl Into<String>,
        beats: f64,
        value: Option<f32>,
        tempo: &TempoMap,
        source: &str,
    ) {
        let source = if source.is_empty() {
            format!("beats@{}", beats)
        } else {
            source.to_string()
        };
        self.schedule(AutomationEvent {
            time_seconds: tempo.beats_to_seconds(beats),
            target: target.into(),
            parameter: parameter.into(),
            value,
            source,
        });
    }

    /// Lazily pop every event with `time_seconds <= t + TIME_EPSILON` in
    /// ascending time order.
    ///
    /// This is a single-pass drain: events the caller does not consume
    /// before the iterator is dropped remain queued for the next call.
    pub fn pop_events_up_to(&mut self, t: f64) -> PendingEvents<'_> {
        PendingEvents {
            timeline: self,
            horizon: t,
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Draining iterator returned by [`AutomationTimeline::pop_events_up_to`].
pub struct PendingEvents<'a> {
    timeline: &'a mut AutomationTimeline,
    horizon: f64,
}

impl Iterator for PendingEvents<'_> {
    type Item = AutomationEvent;

    fn next(&mut self) -> Option<AutomationEvent> {
        let due = matches!(
            self.timeline.heap.peek(),
            Some(std::cmp::Reverse(next)) if next.event.time_seconds <= self.horizon + TIME_EPSILON
        );
        if due {
            self.timeline
                .heap
                .pop()
                .map(|std::cmp::Reverse(scheduled)| scheduled.event)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: f64, value: f32) -> AutomationEvent {
        AutomationEvent {
            time_seconds: time,
            target: "osc".into(),
            parameter: "amplitude".into(),
            value: Some(value),
            source: String::new(),
        }
    }

    #[test]
    fn events_pop_in_time_order() {
        let mut timeline = AutomationTimeline::new();
        timeline.schedule(event(2.0, 0.2));
        timeline.schedule(event(0.5, 0.5));
        timeline.schedule(event(1.0, 1.0));

        let times: Vec<f64> = timeline
            .pop_events_up_to(10.0)
            .map(|e| e.time_seconds)
            .collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn simultaneous_events_keep_insertion_order() {
        let mut timeline = AutomationTimeline::new();
        timeline.schedule(event(1.0, 0.1));
        timeline.schedule(event(1.0, 0.2));
        timeline.schedule(event(1.0, 0.3));

        let values: Vec<Option<f32>> = timeline.pop_events_up_to(1.0).map(|e| e.value).collect();
        assert_eq!(values, vec![Some(0.1), Some(0.2), Some(0.3)]);
    }

    #[test]
    fn future_events_stay_queued() {
        let mut timeline = AutomationTimeline::new();
        timeline.schedule(event(0.5, 0.5));
        timeline.schedule(event(5.0, 0.9));

        assert_eq!(timeline.pop_events_up_to(1.0).count(), 1);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.pop_events_up_to(5.0).count(), 1);
        assert!(timeline.is_empty());
    }

    #[test]
    fn unconsumed_events_are_not_lost() {
        let mut timeline = AutomationTimeline::new();
        timeline.schedule(event(0.1, 0.1));
        timeline.schedule(event(0.2, 0.2));

        // Take only the first due event; the second must survive.
        let first = timeline.pop_events_up_to(1.0).next().unwrap();
        assert_eq!(first.time_seconds, 0.1);
        assert_eq!(timeline.len(), 1);

        let second = timeline.pop_events_up_to(1.0).next().unwrap();
        assert_eq!(second.time_seconds, 0.2);
    }

    #[test]
    fn epsilon_tolerates_float_accumulation() {
        let mut timeline = AutomationTimeline::new();
        timeline.schedule(event(0.3, 1.0));

        // A horizon reconstructed by repeated addition lands slightly
        // below the scheduled time.
        let mut horizon = 0.0_f64;
        for _ in 0..3 {
            horizon += 0.1;
        }
        assert!(horizon < 0.3);
        assert_eq!(timeline.pop_events_up_to(horizon).count(), 1);
    }

    #[test]
    fn beats_convert_through_tempo() {
        let tempo = TempoMap::new(60.0, 4).unwrap();
        let mut timeline = AutomationTimeline::new();
        timeline.schedule_in_beats("osc", "frequency_hz", 2.0, Some(880.0), &tempo, "pitch lift");

        let popped: Vec<AutomationEvent> = timeline.pop_events_up_to(2.0).collect();
        assert_eq!(popped.len(), 1);
        assert!((popped[0].time_seconds - 2.0).abs() < 1e-9);
        assert_eq!(popped[0].source, "pitch lift");
    }

    #[test]
    fn empty_source_gets_beats_tag() {
        let tempo = TempoMap::default();
        let mut timeline = AutomationTimeline::new();
        timeline.schedule_in_beats("osc", "amplitude", 4.0, Some(0.5), &tempo, "");

        let popped: Vec<AutomationEvent> = timeline.pop_events_up_to(100.0).collect();
        assert_eq!(popped[0].source, "beats@4");
    }
}
