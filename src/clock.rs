use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Supplies the "business date" for transfer documents.
///
/// The platform anchors document dates to a fixed business timezone instead of
/// UTC-now so that a transfer created late in the evening does not land on the
/// previous or next calendar day depending on the server's clock.
#[derive(Debug, Clone, Copy)]
pub struct BusinessClock {
    offset: FixedOffset,
}

impl BusinessClock {
    /// Builds a clock from a UTC offset expressed in minutes (east positive).
    /// Offsets outside the valid chrono range fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60))
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is always valid"));
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::from_offset_minutes(0)
    }

    /// Wall-clock time in the business timezone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// The calendar date transfers are stamped with.
    pub fn business_date(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// `YYYYMM` period used for transfer-number sequences.
    pub fn period(&self) -> String {
        self.now().format("%Y%m").to_string()
    }

    /// Period for an explicit document date (used when a caller supplies a
    /// transfer date instead of defaulting to today).
    pub fn period_for(date: NaiveDate) -> String {
        date.format("%Y%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn period_matches_business_date() {
        let clock = BusinessClock::from_offset_minutes(480); // UTC+8
        let date = clock.business_date();
        assert_eq!(clock.period(), format!("{:04}{:02}", date.year(), date.month()));
    }

    #[test]
    fn invalid_offset_falls_back_to_utc() {
        let clock = BusinessClock::from_offset_minutes(i32::MAX / 60);
        assert_eq!(clock.business_date(), Utc::now().date_naive());
    }

    #[test]
    fn period_for_formats_year_month() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(BusinessClock::period_for(date), "202608");
    }
}
