//! Bounded per-endpoint sample history.
//!
//! Each endpoint owns one ring behind its own lock. The scheduler is the only
//! writer; readers get point-in-time copies through [`HistoryStore::snapshot`],
//! so a snapshot never changes after it is taken.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::endpoint::{Endpoint, EndpointId};
use crate::error::StoreError;
use crate::sample::{Outcome, Sample, Throughput, ThroughputSample};

/// Fixed-capacity FIFO. Pushing onto a full ring evicts the oldest entry.
#[derive(Debug, Clone)]
pub(crate) struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
        debug_assert!(self.items.len() <= self.capacity);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Oldest to newest
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

pub struct HistoryStore {
    capacity: usize,
    rings: HashMap<EndpointId, Mutex<Ring<Sample>>>,
    throughput: Mutex<Ring<ThroughputSample>>,
}

impl HistoryStore {
    /// Creates one empty ring per endpoint. The endpoint set is fixed for the
    /// lifetime of the store.
    pub fn new(capacity: usize, endpoints: &[Endpoint]) -> Self {
        let rings = endpoints
            .iter()
            .map(|endpoint| (endpoint.id, Mutex::new(Ring::new(capacity))))
            .collect();

        Self { capacity, rings, throughput: Mutex::new(Ring::new(capacity)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an outcome stamped with the current time
    pub fn record(&self, id: EndpointId, outcome: Outcome) -> Result<(), StoreError> {
        self.record_sample(id, Sample::new(Utc::now(), outcome))
    }

    pub fn record_sample(&self, id: EndpointId, sample: Sample) -> Result<(), StoreError> {
        let mut ring = self.ring(id)?;
        ring.push(sample);
        Ok(())
    }

    /// Copy of the endpoint's samples, oldest first. Empty until the first
    /// record.
    pub fn snapshot(&self, id: EndpointId) -> Result<Vec<Sample>, StoreError> {
        Ok(self.ring(id)?.to_vec())
    }

    pub fn len(&self, id: EndpointId) -> Result<usize, StoreError> {
        Ok(self.ring(id)?.len())
    }

    pub fn record_throughput(&self, throughput: Throughput) {
        let sample = ThroughputSample { at: Utc::now(), throughput };
        self.throughput.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(sample);
    }

    pub fn throughput_snapshot(&self) -> Vec<ThroughputSample> {
        self.throughput.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).to_vec()
    }

    fn ring(&self, id: EndpointId) -> Result<MutexGuard<'_, Ring<Sample>>, StoreError> {
        self.rings
            .get(&id)
            .ok_or(StoreError::UnknownEndpoint(id))?
            .lock()
            .map_err(|_| StoreError::Poisoned(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ProbeKind;
    use crate::sample::FailureReason;
    use std::time::Duration;

    fn endpoints(count: usize) -> Vec<Endpoint> {
        (0..count)
            .map(|i| Endpoint::new(EndpointId(i), format!("host{i}"), 80, ProbeKind::Tcp))
            .collect()
    }

    fn ms(value: u64) -> Outcome {
        Outcome::Success(Duration::from_millis(value))
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring = Ring::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.to_vec(), vec![2, 3, 4]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_snapshot_empty_before_first_record() {
        let store = HistoryStore::new(5, &endpoints(1));
        assert!(store.snapshot(EndpointId(0)).unwrap().is_empty());
        assert_eq!(store.len(EndpointId(0)).unwrap(), 0);
    }

    #[test]
    fn test_fifo_eviction_keeps_last_n() {
        let capacity = 4;
        let store = HistoryStore::new(capacity, &endpoints(1));
        let id = EndpointId(0);

        for i in 0..(capacity as u64 + 3) {
            store.record(id, ms(i)).unwrap();
        }

        let latencies: Vec<_> = store
            .snapshot(id)
            .unwrap()
            .iter()
            .map(|s| s.outcome.latency().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(latencies, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_histories_are_independent() {
        let store = HistoryStore::new(3, &endpoints(2));
        store.record(EndpointId(0), ms(10)).unwrap();
        store.record(EndpointId(1), Outcome::Failure(FailureReason::Timeout)).unwrap();
        store.record(EndpointId(1), ms(20)).unwrap();

        assert_eq!(store.len(EndpointId(0)).unwrap(), 1);
        assert_eq!(store.len(EndpointId(1)).unwrap(), 2);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let store = HistoryStore::new(3, &endpoints(1));
        let id = EndpointId(0);
        store.record(id, ms(1)).unwrap();

        let before = store.snapshot(id).unwrap();
        store.record(id, ms(2)).unwrap();
        let after = store.snapshot(id).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert_eq!(after.last().unwrap().outcome, ms(2));
    }

    #[test]
    fn test_unknown_endpoint_is_an_error() {
        let store = HistoryStore::new(3, &endpoints(1));
        assert_eq!(
            store.record(EndpointId(7), ms(1)),
            Err(StoreError::UnknownEndpoint(EndpointId(7)))
        );
        assert!(store.snapshot(EndpointId(7)).is_err());
    }

    #[test]
    fn test_throughput_ring_shares_capacity() {
        let store = HistoryStore::new(2, &endpoints(1));
        for bytes in [100, 200, 300] {
            store.record_throughput(Throughput::Measured { bytes, elapsed: Duration::from_secs(1) });
        }
        let snapshot = store.throughput_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].throughput.bytes_per_sec(), Some(300.0));
    }
}
