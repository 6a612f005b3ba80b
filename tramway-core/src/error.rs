use thiserror::Error;

use crate::{RouteId, ScheduleTime};

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Segment identity overflow: route {route_id}, departure {departure_time}, stop index {seg_start}"
    )]
    SegmentIdOverflow {
        route_id: RouteId,
        departure_time: ScheduleTime,
        seg_start: usize,
    },
    #[error("Inconsistent transport data: {0}")]
    DataInconsistency(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Map data index error: {0}")]
    Index(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}

impl Error {
    /// Errors that only degrade coverage unless the caller asked for strict mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SegmentIdOverflow { .. } | Error::DataInconsistency(_)
        )
    }
}
