//! The calculator strategy interface.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::models::{CalculationRequest, CalculationResult, PlanKind};

use super::result_cache::{CacheKey, ResultCache};

/// One compensation strategy.
///
/// Implementors provide [`compute`](Calculator::compute), which may fail with
/// a typed error. Callers use [`calculate`](Calculator::calculate), which
/// never fails: errors become a result with `success == false`, and
/// successful results are served from and stored in the calculator's cache
/// when it has one.
pub trait Calculator: Send + Sync {
    /// The plan kind this calculator implements.
    fn kind(&self) -> PlanKind;

    /// Computes the result for a request.
    fn compute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult>;

    /// The calculator's result cache, if caching is enabled.
    fn result_cache(&self) -> Option<&ResultCache> {
        None
    }

    /// The cache identity of a request.
    fn cache_key(&self, request: &CalculationRequest) -> CacheKey {
        CacheKey::for_request(request)
    }

    /// Computes the result for a request, capturing any failure inline.
    fn calculate(&self, request: &CalculationRequest) -> CalculationResult {
        let started = Instant::now();
        let cache = self.result_cache();
        let key = cache.map(|_| self.cache_key(request));

        if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
            if let Some(hit) = cache.get(key) {
                return hit;
            }
        }

        let result = self
            .compute(request)
            .unwrap_or_else(|error| CalculationResult::failure(request, error.to_string()));

        if result.success {
            debug!(
                employee_id = %request.employee.id,
                plan_id = %request.plan.id,
                period = %request.period,
                calculator = %self.kind(),
                total = %result.total,
                duration_us = started.elapsed().as_micros() as u64,
                "Calculation completed"
            );
            if let (Some(cache), Some(key)) = (cache, key) {
                cache.insert(key, result.clone());
            }
        } else {
            warn!(
                employee_id = %request.employee.id,
                plan_id = %request.plan.id,
                period = %request.period,
                calculator = %self.kind(),
                error = result.error.as_deref().unwrap_or_default(),
                "Calculation failed"
            );
        }
        result
    }
}
