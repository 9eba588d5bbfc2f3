use std::time::Duration;

use serde::{Serialize, Serializer};

pub const HEALTHY_MESSAGE: &str = "It's healthy";

const HEAVY_LOAD_OPEN_CONNECTIONS: u32 = 40;
const HIGH_WAIT_COUNT: u64 = 1000;

/// Snapshot of connection-pool counters at probe time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    pub wait_count: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub wait_duration: Duration,
    pub max_idle_closed: u64,
    pub max_lifetime_closed: u64,
}

impl PoolStats {
    /// Human-readable verdict on the counters. Checks run from least to most
    /// specific and the last one that trips wins.
    pub fn advisory(&self) -> &'static str {
        let half_open = u64::from(self.open_connections) / 2;
        let mut message = HEALTHY_MESSAGE;

        if self.open_connections > HEAVY_LOAD_OPEN_CONNECTIONS {
            message = "The database is experiencing heavy load.";
        }
        if self.wait_count > HIGH_WAIT_COUNT {
            message = "The database has a high number of wait events, indicating potential bottlenecks.";
        }
        if self.max_idle_closed > half_open {
            message = "Many idle connections are being closed, consider revising the connection pool settings.";
        }
        if self.max_lifetime_closed > half_open {
            message = "Many connections are being closed due to max lifetime, consider increasing max lifetime or revising the connection usage pattern.";
        }
        message
    }
}

fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{d:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Body of `GET /health`: a flat map of status plus pool counters when up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub stats: Option<PoolStats>,
}

impl HealthReport {
    pub fn up(stats: PoolStats) -> Self {
        Self {
            status: HealthStatus::Up,
            message: Some(stats.advisory().to_string()),
            error: None,
            stats: Some(stats),
        }
    }

    pub fn down(cause: impl std::fmt::Display) -> Self {
        Self {
            status: HealthStatus::Down,
            message: None,
            error: Some(format!("db down: {cause}")),
            stats: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(open: u32) -> PoolStats {
        PoolStats {
            open_connections: open,
            in_use: 0,
            idle: open,
            ..PoolStats::default()
        }
    }

    #[test]
    fn quiet_pool_is_healthy() {
        assert_eq!(stats(4).advisory(), HEALTHY_MESSAGE);
        assert_eq!(stats(0).advisory(), HEALTHY_MESSAGE);
    }

    #[test]
    fn more_than_forty_open_is_heavy_load() {
        assert_eq!(stats(40).advisory(), HEALTHY_MESSAGE);
        assert!(stats(41).advisory().contains("heavy load"));
    }

    #[test]
    fn wait_count_threshold_is_exclusive() {
        let mut s = stats(4);
        s.wait_count = 1000;
        assert_eq!(s.advisory(), HEALTHY_MESSAGE);
        s.wait_count = 1001;
        assert!(s.advisory().contains("wait events"));
    }

    #[test]
    fn recycling_compares_against_half_the_open_connections() {
        let mut s = stats(10);
        s.max_idle_closed = 5;
        assert_eq!(s.advisory(), HEALTHY_MESSAGE);
        s.max_idle_closed = 6;
        assert!(s.advisory().contains("idle connections"));
    }

    #[test]
    fn later_checks_override_earlier_ones() {
        let mut s = stats(50);
        s.wait_count = 5000;
        s.max_idle_closed = 30;
        s.max_lifetime_closed = 30;
        assert!(s.advisory().contains("max lifetime"));
    }

    #[test]
    fn up_report_is_flat() {
        let json = serde_json::to_value(HealthReport::up(stats(3))).unwrap();
        assert_eq!(json["status"], "up");
        assert_eq!(json["message"], HEALTHY_MESSAGE);
        assert_eq!(json["open_connections"], 3);
        assert_eq!(json["wait_duration"], "0ns");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn down_report_carries_only_status_and_error() {
        let report = HealthReport::down("connection refused");
        assert!(!report.is_up());
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "down", "error": "db down: connection refused" })
        );
    }
}
