//! In-memory caching using moka
//!
//! Provides application-level caching for pricing schedules. Schedules
//! change rarely relative to booking traffic, so a short TTL keeps price
//! changes visible without a database round trip per quote. Warehouse
//! capacities and bookings are never cached: availability answers must
//! reflect the current booking set.

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::booking::models::{PricingSchedule, ResourceType};
use crate::booking::queries;
use uuid::Uuid;

/// Application cache holding parsed pricing schedules
#[derive(Clone)]
pub struct AppCache {
    /// Pricing schedules (warehouse/resource key -> schedule)
    pub schedules: Cache<String, Arc<PricingSchedule>>,
}

impl AppCache {
    /// Create a new cache instance with configured TTLs
    pub fn new() -> Self {
        Self {
            // Schedules: 1000 entries, 10 min TTL, 5 min idle
            schedules: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(10 * 60))
                .time_to_idle(Duration::from_secs(5 * 60))
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            schedules_size: self.schedules.entry_count(),
        }
    }

    /// Invalidate all caches
    pub fn invalidate_all(&self) {
        self.schedules.invalidate_all();
        info!("All caches invalidated");
    }

    /// Invalidate the schedule for one warehouse/resource pair
    pub async fn invalidate_schedule(&self, warehouse_id: Uuid, resource_type: ResourceType) {
        let key = Self::schedule_key(warehouse_id, resource_type);
        self.schedules.invalidate(&key).await;
        info!("Cache invalidated for schedule: {}", key);
    }

    /// Generate cache key for a pricing schedule
    pub fn schedule_key(warehouse_id: Uuid, resource_type: ResourceType) -> String {
        format!("schedule:{}:{}", warehouse_id, resource_type)
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub schedules_size: u64,
}

/// Start background cache warmer
///
/// Warms the cache on startup and refreshes every 10 minutes.
pub async fn start_cache_warmer(cache: AppCache, db: PgPool) {
    // Initial warm-up
    warm_cache(&cache, &db).await;

    // Periodic refresh every 10 minutes
    let mut interval = interval(Duration::from_secs(10 * 60));
    loop {
        interval.tick().await;
        warm_cache(&cache, &db).await;
    }
}

/// Warm the cache with all active pricing schedules
async fn warm_cache(cache: &AppCache, db: &PgPool) {
    info!("Starting cache warm-up...");

    match queries::get_active_pricing_schedules(db).await {
        Ok(rows) => {
            for row in rows {
                match row.into_schedule() {
                    Ok(schedule) => {
                        let key =
                            AppCache::schedule_key(schedule.warehouse_id, schedule.resource_type);
                        cache.schedules.insert(key, Arc::new(schedule)).await;
                    }
                    Err(e) => warn!("Skipping malformed schedule during warm-up: {}", e),
                }
            }
        }
        Err(e) => warn!("Failed to warm schedule cache: {}", e),
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}
