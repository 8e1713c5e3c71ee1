use time::{OffsetDateTime, PrimitiveDateTime};

/// Source of "now" for default timestamps and hour buckets.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Local wall-clock time. Falls back to UTC when the local offset cannot be
/// determined (e.g. multi-threaded on some Unix platforms).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|err| {
            tracing::debug!(error = %err, "local offset unavailable, using UTC");
            OffsetDateTime::now_utc()
        });
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}
