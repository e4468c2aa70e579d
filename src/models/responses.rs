//! Response DTOs for the cache admin API
//!
//! Every body carries `success` and an RFC 3339 `timestamp`.

use serde::Serialize;

use crate::cache::{EntityKind, HealthReport, StatsSnapshot, WarmFailure, WarmReport};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsSnapshot,
    pub timestamp: String,
}

impl StatsResponse {
    pub fn new(stats: StatsSnapshot) -> Self {
        Self {
            success: true,
            stats,
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for GET /api/cache/health
///
/// `success` mirrors `health.overall`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub health: HealthReport,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(health: HealthReport) -> Self {
        Self {
            success: health.overall,
            health,
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for DELETE /api/cache/clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

impl ClearResponse {
    pub fn new(success: bool) -> Self {
        let message = if success {
            "Cache cleared successfully"
        } else {
            "Failed to clear cache"
        };
        Self {
            success,
            message: message.to_string(),
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for DELETE /api/cache/invalidate/:pattern
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub success: bool,
    pub message: String,
    pub pattern: String,
    pub deleted_count: usize,
    pub timestamp: String,
}

impl InvalidateResponse {
    pub fn new(pattern: impl Into<String>, deleted_count: usize) -> Self {
        Self {
            success: true,
            message: format!("Invalidated {} cache entries", deleted_count),
            pattern: pattern.into(),
            deleted_count,
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for POST /api/cache/warm
#[derive(Debug, Clone, Serialize)]
pub struct WarmResponse {
    pub success: bool,
    pub message: String,
    pub warmed: Vec<EntityKind>,
    pub failed: Vec<WarmFailure>,
    pub timestamp: String,
}

impl WarmResponse {
    /// Succeeds as long as the run completed; individual loader failures
    /// are listed in `failed`.
    pub fn new(report: WarmReport) -> Self {
        let message = if report.failed.is_empty() {
            "Cache warming completed successfully".to_string()
        } else {
            format!(
                "Cache warming completed with {} failed loader(s)",
                report.failed.len()
            )
        };
        Self {
            success: true,
            message,
            warmed: report.warmed,
            failed: report.failed,
            timestamp: now_rfc3339(),
        }
    }
}

/// Response body for GET /api/cache/info
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub cache_type: String,
    pub features: Vec<String>,
    pub timestamp: String,
}

impl InfoResponse {
    pub fn in_memory() -> Self {
        Self {
            success: true,
            message: "Cache system running in memory".to_string(),
            cache_type: "in-memory".to_string(),
            features: [
                "Automatic TTL expiration",
                "LRU eviction at the key cap",
                "Pattern-based invalidation",
                "ETag conditional requests",
                "Cache statistics",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            timestamp: now_rfc3339(),
        }
    }
}
