//! Calendar and GPS time addressing for requested files.
//!
//! Every archive path and filename is built from one of two addressing
//! schemes: `{year, day-of-year}` for observation-style data and
//! `{GPS week, day-of-week}` for precise products. Both are derived from a
//! single [`NaiveDate`] held by [`Epoch`], so they can never disagree.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::GnssError;

/// Days from 0001-01-01 (day 1) to the GPS epoch, 1980-01-06.
const GPS_EPOCH_DAYS_FROM_CE: i32 = 722_820;

/// Only built through the validating constructors, so the date never precedes
/// the GPS epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Epoch {
    date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minute: Option<u32>,
}

impl Epoch {
    pub fn from_date(date: NaiveDate) -> Result<Self, GnssError> {
        if date.num_days_from_ce() < GPS_EPOCH_DAYS_FROM_CE {
            return Err(GnssError::InvalidEpoch(format!(
                "{date} precedes the GPS epoch 1980-01-06"
            )));
        }
        Ok(Self {
            date,
            hour: None,
            minute: None,
        })
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, GnssError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| GnssError::InvalidEpoch(format!("{year:04}-{month:02}-{day:02}")))?;
        Self::from_date(date)
    }

    pub fn from_year_doy(year: i32, doy: u32) -> Result<Self, GnssError> {
        let date = NaiveDate::from_yo_opt(year, doy)
            .ok_or_else(|| GnssError::InvalidEpoch(format!("{year:04} day {doy:03}")))?;
        Self::from_date(date)
    }

    pub fn from_gps_week(week: u32, day_of_week: u32) -> Result<Self, GnssError> {
        if day_of_week > 6 {
            return Err(GnssError::InvalidEpoch(format!(
                "day of week {day_of_week} in GPS week {week}"
            )));
        }
        let days = i64::from(week) * 7 + i64::from(day_of_week);
        let date = gps_epoch()
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| GnssError::InvalidEpoch(format!("GPS week {week}")))?;
        Self::from_date(date)
    }

    pub fn with_hour(self, hour: u32) -> Result<Self, GnssError> {
        if hour > 23 {
            return Err(GnssError::InvalidHour(hour));
        }
        Ok(Self {
            hour: Some(hour),
            ..self
        })
    }

    /// High-rate files come in 15-minute buckets; any other minute is rejected.
    pub fn with_minute(self, minute: u32) -> Result<Self, GnssError> {
        if minute > 59 || minute % 15 != 0 {
            return Err(GnssError::InvalidEpoch(format!(
                "minute {minute} is not a 15-minute bucket"
            )));
        }
        Ok(Self {
            minute: Some(minute),
            hour: Some(self.hour.unwrap_or(0)),
            ..self
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour(&self) -> Option<u32> {
        self.hour
    }

    pub fn minute(&self) -> Option<u32> {
        self.minute
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Two-digit year used in short RINEX names.
    pub fn yy(&self) -> u32 {
        self.date.year().rem_euclid(100) as u32
    }

    pub fn doy(&self) -> u32 {
        self.date.ordinal()
    }

    fn days_since_gps_epoch(&self) -> u32 {
        // Non-negative by construction: `from_date` rejects earlier dates.
        (self.date.num_days_from_ce() - GPS_EPOCH_DAYS_FROM_CE) as u32
    }

    pub fn gps_week(&self) -> u32 {
        self.days_since_gps_epoch() / 7
    }

    /// 0 = Sunday.
    pub fn day_of_week(&self) -> u32 {
        self.days_since_gps_epoch() % 7
    }

    /// Sunday that opens this epoch's GPS week.
    pub fn week_start(&self) -> Epoch {
        let date = self.date - Duration::days(i64::from(self.day_of_week()));
        Epoch {
            date,
            hour: None,
            minute: None,
        }
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// First day of the calendar month; errors only for January 1980, which
    /// opens before the GPS epoch.
    pub fn month_start(&self) -> Result<Epoch, GnssError> {
        let date = self
            .date
            .with_day(1)
            .ok_or_else(|| GnssError::InvalidEpoch(self.date.to_string()))?;
        Epoch::from_date(date)
    }

    /// Same time of day, shifted by whole days.
    pub fn add_days(&self, days: i64) -> Result<Epoch, GnssError> {
        let date = self
            .date
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| GnssError::InvalidEpoch(format!("{} + {days} days", self.date)))?;
        let mut shifted = Epoch::from_date(date)?;
        shifted.hour = self.hour;
        shifted.minute = self.minute;
        Ok(shifted)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:03}", self.year(), self.doy())?;
        if let Some(hour) = self.hour {
            write!(f, "T{hour:02}")?;
            if let Some(minute) = self.minute {
                write!(f, ":{minute:02}")?;
            }
        }
        Ok(())
    }
}

/// Accepts `YYYY-MM-DD` or `YYYY-DDD`, optionally followed by `THH` or
/// `THH:MM`, so everything `Display` prints parses back.
impl FromStr for Epoch {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || GnssError::InvalidEpoch(value.to_string());
        let (day, time) = match value.split_once('T') {
            Some((day, time)) => (day, Some(time)),
            None => (value, None),
        };

        let epoch = match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            Ok(date) => Self::from_date(date)?,
            Err(_) => {
                let (year, doy) = day.split_once('-').ok_or_else(invalid)?;
                let year = year.parse::<i32>().map_err(|_| invalid())?;
                let doy = doy.parse::<u32>().map_err(|_| invalid())?;
                Self::from_year_doy(year, doy)?
            }
        };

        let Some(time) = time else {
            return Ok(epoch);
        };
        let (hour, minute) = match time.split_once(':') {
            Some((hour, minute)) => (hour, Some(minute)),
            None => (time, None),
        };
        let epoch = epoch.with_hour(hour.parse::<u32>().map_err(|_| invalid())?)?;
        match minute {
            Some(minute) => epoch.with_minute(minute.parse::<u32>().map_err(|_| invalid())?),
            None => Ok(epoch),
        }
    }
}

fn gps_epoch() -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(GPS_EPOCH_DAYS_FROM_CE).unwrap_or(NaiveDate::MIN)
}

/// Session letter for hourly short names: hour 0 is `a`, hour 23 is `x`.
pub fn hour_letter(hour: u32) -> Result<char, GnssError> {
    if hour > 23 {
        return Err(GnssError::InvalidHour(hour));
    }
    Ok(char::from(b'a' + hour as u8))
}
