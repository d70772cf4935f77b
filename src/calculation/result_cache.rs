//! Per-calculator result cache.
//!
//! Each calculator that opts in owns one [`ResultCache`]. Entries are full
//! [`CalculationResult`]s keyed by request identity; only successful results
//! are stored.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::CacheSettings;
use crate::models::{CalculationRequest, CalculationResult};

/// Identity of a cached calculation.
///
/// `plan_id` and `sales_amount` are `None` for the narrow employee-and-period
/// key.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    /// The employee ID.
    pub employee_id: String,
    /// The plan ID, when part of the key.
    pub plan_id: Option<String>,
    /// The sales amount, when part of the key.
    pub sales_amount: Option<Decimal>,
    /// The period identifier.
    pub period: String,
}

impl CacheKey {
    /// The full `{employee, plan, sales, period}` key.
    pub fn for_request(request: &CalculationRequest) -> Self {
        Self {
            employee_id: request.employee.id.clone(),
            plan_id: Some(request.plan.id.clone()),
            sales_amount: Some(request.sales_amount.normalize()),
            period: request.period.clone(),
        }
    }

    /// The `{employee, period}` key.
    ///
    /// A result stored under this key is served even if the plan or sales
    /// figure change within the period, until it is invalidated or expires.
    pub fn employee_period(request: &CalculationRequest) -> Self {
        Self {
            employee_id: request.employee.id.clone(),
            plan_id: None,
            sales_amount: None,
            period: request.period.clone(),
        }
    }
}

/// A point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries currently held (approximate).
    pub entries: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent, bounded, expiring store of calculation results.
pub struct ResultCache {
    inner: Cache<CacheKey, CalculationResult>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.inner.entry_count())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl ResultCache {
    /// Creates a cache with the configured capacity and time-to-live.
    pub fn new(settings: &CacheSettings) -> Self {
        let inner = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_live(settings.ttl())
            .build();

        Self {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a result, counting the hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<CalculationResult> {
        let result = self.inner.get(key);
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(employee_id = %key.employee_id, period = %key.period, "Result cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(employee_id = %key.employee_id, period = %key.period, "Result cache miss");
        }
        result
    }

    /// Stores a result. Failed results are ignored.
    pub fn insert(&self, key: CacheKey, result: CalculationResult) {
        if result.success {
            self.inner.insert(key, result);
        }
    }

    /// Removes one entry.
    pub fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Returns the current counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.inner.entry_count(),
        }
    }
}
