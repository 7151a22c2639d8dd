use chrono::{DateTime, TimeZone, Utc};

/// Source of the creation timestamps written into artifact attributes
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// `history` attribute text, e.g. `Created Thu Oct 15 09:30:00 2026`
    fn history(&self) -> String {
        format!("Created {}", self.now().format("%a %b %e %H:%M:%S %Y"))
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_timestamp(seconds: i64) -> Self {
        Self(Utc.timestamp_opt(seconds, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_history() {
        let clock = FixedClock::from_timestamp(0);
        assert_eq!(clock.history(), "Created Thu Jan  1 00:00:00 1970");
    }
}
