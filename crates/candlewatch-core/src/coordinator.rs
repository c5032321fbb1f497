use std::sync::Arc;

use candlewatch_data::{Bar, BarStore, Interval};
use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tracing::{instrument, warn};

use crate::engine::{IndicatorEngine, MIN_CONTEXT};
use crate::error::CoordinatorError;

/// The ingestion coordinator (C4): for each fresh batch of one-minute bars,
/// guarantees enough historical context before indicators are computed, and
/// writes the enriched bars atomically. Per-instrument work is serialized
/// (one `tokio::sync::Mutex` per instrument key, in a `DashMap`); across
/// instruments, a `Semaphore` bounds the worker pool (spec §5: default =
/// physical cores, minimum 4).
pub struct IngestionCoordinator<S: BarStore> {
    store: Arc<S>,
    engine: IndicatorEngine,
    instrument_locks: DashMap<String, Arc<Mutex<()>>>,
    worker_pool: Arc<Semaphore>,
}

impl<S: BarStore> IngestionCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        let worker_count = num_cpus::get().max(4);
        Self {
            store,
            engine: IndicatorEngine::new(),
            instrument_locks: DashMap::new(),
            worker_pool: Arc::new(Semaphore::new(worker_count)),
        }
    }

    fn lock_for(&self, instrument_key: &str) -> Arc<Mutex<()>> {
        self.instrument_locks
            .entry(instrument_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Implements the six-step algorithm of spec §4.4.
    #[instrument(skip(self, raw_bars), fields(instrument = %instrument_key, n = raw_bars.len()))]
    pub async fn ingest(
        &self,
        instrument_key: &str,
        raw_bars: Vec<Bar>,
    ) -> Result<usize, CoordinatorError> {
        if raw_bars.is_empty() {
            return Err(CoordinatorError::EmptyBatch);
        }

        let _permit = self
            .worker_pool
            .acquire()
            .await
            .expect("worker pool semaphore is never closed");
        let instrument_lock = self.lock_for(instrument_key);
        let _guard = instrument_lock.lock().await;

        // Step 1: reorient. Broker batches may arrive newest-first; this is
        // the single choke point where direction is fixed (spec §9).
        let mut raw_bars = raw_bars;
        if raw_bars.len() > 1 && raw_bars[0].timestamp > raw_bars[raw_bars.len() - 1].timestamp {
            raw_bars.reverse();
        }

        // Step 2: context assembly.
        let need = MIN_CONTEXT.saturating_sub(raw_bars.len());
        let mut context = if need > 0 {
            let earliest = raw_bars[0].timestamp;
            let history = self
                .store
                .get_last_n(instrument_key, Interval::M1, need, earliest - 1)?;
            history
        } else {
            Vec::new()
        };
        let new_timestamps: Vec<i64> = raw_bars.iter().map(|b| b.timestamp).collect();
        context.extend(raw_bars);

        // Step 3: validate ordering; warn and continue (spec's DATA_ORDER
        // semantics — this does not silently proceed, but it does not
        // abort either).
        for window in context.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                warn!(
                    instrument = instrument_key,
                    prev = window[0].timestamp,
                    next = window[1].timestamp,
                    "non-monotonic timestamps in ingest batch"
                );
            }
        }

        // Step 4: enrich. A genuinely new instrument can still have
        // context shorter than MIN_CONTEXT; the engine is called anyway and
        // warm-up sentinels propagate without error (spec §4.4).
        let enriched = self.engine.enrich_best_effort(&context);

        // Step 5: project — keep only the newly ingested bars.
        let projection: Vec<Bar> = enriched
            .into_iter()
            .filter(|b| new_timestamps.contains(&b.timestamp))
            .collect();

        // Step 6: persist.
        let count = self.store.put_bars(&projection)?;
        Ok(count)
    }
}
