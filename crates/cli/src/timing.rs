#![forbid(unsafe_code)]

use std::time::Instant;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

pub struct RunClock {
    started_at: OffsetDateTime,
    started: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    /// Logs start, end and elapsed time of the run.
    pub fn finish(self) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            started = %rfc3339(self.started_at),
            ended = %rfc3339(OffsetDateTime::now_utc()),
            elapsed_ms,
            "run timing"
        );
    }
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
