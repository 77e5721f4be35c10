// Traffic session aggregator
//
// Owns the bounded event log and the session-wide counters. The graph reads
// its active window from the tail of this log; the counters are independent
// of the window and only go back to zero on an explicit reset.

use super::{Protocol, TrafficEvent};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Maximum number of events kept in the recent-event log
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Running totals since the last reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total_events: u64,
    pub total_attacks: u64,
    pub total_bytes: u64,

    /// Every address seen as source or destination
    pub seen_addresses: BTreeSet<String>,

    /// Event count per protocol tag
    pub protocol_counts: BTreeMap<Protocol, u64>,

    /// Every address that has been the source of a flagged event
    pub flagged_addresses: BTreeSet<String>,
}

impl SessionStats {
    /// Number of distinct addresses seen this session
    pub fn active_ip_count(&self) -> usize {
        self.seen_addresses.len()
    }

    /// Protocol histogram, busiest protocol first
    pub fn protocol_distribution(&self) -> Vec<(Protocol, u64)> {
        let mut dist: Vec<(Protocol, u64)> = self
            .protocol_counts
            .iter()
            .map(|(proto, count)| (*proto, *count))
            .collect();
        dist.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        dist
    }

    pub fn has_threats(&self) -> bool {
        self.total_attacks > 0
    }
}

/// Consumes traffic batches and keeps session totals plus a bounded log
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    log: VecDeque<TrafficEvent>,
    capacity: usize,
    stats: SessionStats,
}

impl SessionAggregator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: VecDeque::with_capacity(capacity),
            capacity,
            stats: SessionStats::default(),
        }
    }

    /// Fold a batch into the log and the running totals
    ///
    /// Events are applied in arrival order. The log evicts its oldest entries
    /// (by arrival, not by timestamp) once it exceeds its capacity.
    pub fn ingest<I>(&mut self, batch: I) -> &SessionStats
    where
        I: IntoIterator<Item = TrafficEvent>,
    {
        let mut ingested = 0usize;
        let mut evicted = 0usize;

        for event in batch {
            let stats = &mut self.stats;
            stats.total_events += 1;
            stats.total_bytes = stats.total_bytes.saturating_add(event.size);
            if event.is_attack {
                stats.total_attacks += 1;
                stats.flagged_addresses.insert(event.source_ip.clone());
            }
            stats.seen_addresses.insert(event.source_ip.clone());
            stats.seen_addresses.insert(event.dest_ip.clone());
            *stats.protocol_counts.entry(event.protocol).or_insert(0) += 1;

            self.log.push_back(event);
            while self.log.len() > self.capacity {
                self.log.pop_front();
                evicted += 1;
            }
            ingested += 1;
        }

        if ingested > 0 {
            debug!(
                ingested,
                evicted,
                logged = self.log.len(),
                total = self.stats.total_events,
                "Ingested traffic batch"
            );
        }

        &self.stats
    }

    /// Zero every counter and clear the log in one step
    pub fn reset(&mut self) {
        self.log.clear();
        self.stats = SessionStats::default();
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The newest `n` logged events, oldest first
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &TrafficEvent> + '_ {
        let skip = self.log.len().saturating_sub(n);
        self.log.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::AttackType;
    use proptest::prelude::*;

    fn event(id: usize, src: &str, dst: &str, proto: Protocol, size: u64) -> TrafficEvent {
        TrafficEvent::new(format!("e{}", id), id as u64, src, dst, proto, size)
    }

    #[test]
    fn test_ingest_accumulates_totals() {
        let mut agg = SessionAggregator::new(10);
        let stats = agg.ingest(vec![
            event(1, "192.168.1.10", "8.8.8.8", Protocol::Https, 100),
            event(2, "192.168.1.10", "1.1.1.1", Protocol::Dns, 50),
            event(3, "45.1.2.3", "192.168.1.10", Protocol::Tcp, 25).with_attack(AttackType::PortScan),
        ]);

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.total_attacks, 1);
        assert_eq!(stats.total_bytes, 175);
        assert_eq!(stats.active_ip_count(), 4);
        assert!(stats.flagged_addresses.contains("45.1.2.3"));
        assert!(stats.has_threats());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut agg = SessionAggregator::new(10);
        agg.ingest(vec![event(1, "a", "b", Protocol::Tcp, 1)]);
        let before = agg.stats().clone();
        agg.ingest(Vec::new());
        assert_eq!(agg.stats(), &before);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_log_evicts_oldest_by_arrival() {
        let mut agg = SessionAggregator::new(3);
        // Timestamps deliberately out of order: eviction ignores them
        let batch = vec![
            TrafficEvent::new("first", 900, "a", "b", Protocol::Tcp, 1),
            TrafficEvent::new("second", 100, "a", "b", Protocol::Tcp, 1),
            TrafficEvent::new("third", 500, "a", "b", Protocol::Tcp, 1),
            TrafficEvent::new("fourth", 50, "a", "b", Protocol::Tcp, 1),
        ];
        agg.ingest(batch);

        let ids: Vec<&str> = agg.log.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "third", "fourth"]);
        // Counters are all-time, not log-bound
        assert_eq!(agg.stats().total_events, 4);
    }

    #[test]
    fn test_recent_returns_tail_oldest_first() {
        let mut agg = SessionAggregator::new(10);
        agg.ingest((0..6).map(|i| event(i, "a", "b", Protocol::Udp, 1)));

        let ids: Vec<&str> = agg.recent(3).map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e4", "e5"]);
        assert_eq!(agg.recent(100).count(), 6);
        assert_eq!(agg.recent(0).count(), 0);
    }

    #[test]
    fn test_protocol_distribution_sorted_by_count() {
        let mut agg = SessionAggregator::new(10);
        agg.ingest(vec![
            event(1, "a", "b", Protocol::Udp, 1),
            event(2, "a", "b", Protocol::Tcp, 1),
            event(3, "a", "b", Protocol::Tcp, 1),
            event(4, "a", "b", Protocol::Arp, 1),
        ]);
        let dist = agg.stats().protocol_distribution();
        assert_eq!(dist[0], (Protocol::Tcp, 2));
        assert_eq!(dist.len(), 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut agg = SessionAggregator::new(10);
        agg.ingest(vec![
            event(1, "192.168.1.10", "8.8.8.8", Protocol::Https, 100).with_attack(AttackType::Mitm),
        ]);
        agg.reset();

        assert!(agg.is_empty());
        assert_eq!(agg.stats(), &SessionStats::default());
        assert_eq!(agg.stats().active_ip_count(), 0);
        assert!(agg.stats().protocol_distribution().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The log never exceeds its capacity and always holds the newest events
        #[test]
        fn prop_log_is_bounded_fifo(capacity in 1usize..50, count in 0usize..200) {
            let mut agg = SessionAggregator::new(capacity);
            agg.ingest((0..count).map(|i| event(i, "a", "b", Protocol::Tcp, 1)));

            prop_assert_eq!(agg.len(), count.min(capacity));
            prop_assert_eq!(agg.stats().total_events, count as u64);
            if let Some(last) = agg.log.back() {
                prop_assert_eq!(last.id.clone(), format!("e{}", count - 1));
            }
        }

        /// Splitting a stream into batches does not change the totals
        #[test]
        fn prop_batching_is_transparent(sizes in proptest::collection::vec(0u64..5000, 0..40), split in 0usize..40) {
            let events: Vec<TrafficEvent> = sizes
                .iter()
                .enumerate()
                .map(|(i, s)| event(i, "10.0.0.1", &format!("10.0.0.{}", i % 7), Protocol::Udp, *s))
                .collect();
            let split = split.min(events.len());

            let mut whole = SessionAggregator::new(500);
            whole.ingest(events.clone());

            let mut parts = SessionAggregator::new(500);
            parts.ingest(events[..split].to_vec());
            parts.ingest(events[split..].to_vec());

            prop_assert_eq!(whole.stats(), parts.stats());
        }
    }
}
