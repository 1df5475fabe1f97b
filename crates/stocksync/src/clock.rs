//! Wall-clock source for run stamps

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Artifact stamp format, sorts chronologically
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Human-readable time used in logs and the change log header
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn stamp(&self) -> String {
        self.now().format(STAMP_FORMAT).to_string()
    }

    fn display_time(&self) -> String {
        self.now().format(DISPLAY_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    /// Freeze at a local wall-clock time; `None` if it does not exist locally.
    pub fn at_local(naive: NaiveDateTime) -> Option<Self> {
        Local.from_local_datetime(&naive).earliest().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_fixed_clock_formats() {
        let naive = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 25, 1)
            .unwrap();
        let clock = FixedClock::at_local(naive).unwrap();
        assert_eq!(clock.stamp(), "20261019_142501");
        assert_eq!(clock.display_time(), "2026-10-19 14:25:01");
    }

    #[test]
    fn test_system_clock_stamp_shape() {
        let stamp = SystemClock.stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
    }
}
