use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

/// The moment a run starts, in the local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTime(OffsetDateTime);

impl RunTime {
    pub fn now(offset: UtcOffset) -> Self {
        Self(OffsetDateTime::now_utc().to_offset(offset))
    }

    pub fn at(moment: OffsetDateTime) -> Self {
        Self(moment)
    }

    pub fn year(&self) -> String {
        self.0.year().to_string()
    }

    /// ISO-8601 with milliseconds and the UTC offset, every `:` replaced by
    /// `.` so the result is a valid file name everywhere.
    pub fn stamp(&self) -> String {
        // Infallible: every component of FORMAT exists on an OffsetDateTime.
        self.0.format(FORMAT).unwrap_or_default().replace(':', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_stamp() {
        let run = RunTime::at(datetime!(2024-05-01 18:30:12.345 +2));
        assert_eq!(run.stamp(), "2024-05-01T18.30.12.345+02.00");
        assert_eq!(run.year(), "2024");
    }

    #[test]
    fn test_stamp_negative_offset_and_padding() {
        let run = RunTime::at(datetime!(2023-01-02 03:04:05.006 -05:30));
        assert_eq!(run.stamp(), "2023-01-02T03.04.05.006-05.30");
    }

    #[test]
    fn test_now_uses_offset() {
        let offset = UtcOffset::from_hms(1, 0, 0).unwrap();
        assert!(RunTime::now(offset).stamp().ends_with("+01.00"));
    }
}
