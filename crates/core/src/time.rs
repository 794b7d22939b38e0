use chrono::{DateTime, Duration, Utc};

/// Source of "now" for services. Tests pin it with [`Clock::fixed`].
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Returns a clock moved forward by `delta`. A system clock is unchanged.
    #[must_use]
    pub fn advanced(self, delta: Duration) -> Self {
        match self {
            Clock::System => Clock::System,
            Clock::Fixed(t) => Clock::Fixed(t + delta),
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_by_value() {
        let clock = fixed_clock();
        let later = clock.advanced(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now());
        assert_eq!(later.now() - clock.now(), Duration::hours(2));
    }
}
