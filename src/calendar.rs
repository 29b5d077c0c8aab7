//! Day-attribute calendar shipped with every compiled program.
//!
//! The runtime needs, for each day it may be running on, the sunrise and
//! sunset offsets and a set of day flags (weekday, working/non-working,
//! summer/winter time).  The window starts two days in the past so a
//! controller that boots with a slightly stale clock still finds its day.
//
//  Lifecycle:
//
//      Calendar::new      weekday + weekend flags, daylight offsets
//      Calendar::set_day  DAY declarations (holidays, BST/GMT changeovers)
//      Calendar::complete derived WORK/FIRSTWORK flags and season fill

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::ops::{BitOr, BitOrAssign};

pub const BACKTRACK_DAYS: i64 = 2;
pub const WINDOW_DAYS: usize = 2 + 1 + 366 * 2;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i64 = 719_163;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DayFlags(pub u32);

impl DayFlags {
    pub const NONE: DayFlags = DayFlags(0);
    pub const SUN: DayFlags = DayFlags(1 << 0);
    pub const MON: DayFlags = DayFlags(1 << 1);
    pub const TUE: DayFlags = DayFlags(1 << 2);
    pub const WED: DayFlags = DayFlags(1 << 3);
    pub const THU: DayFlags = DayFlags(1 << 4);
    pub const FRI: DayFlags = DayFlags(1 << 5);
    pub const SAT: DayFlags = DayFlags(1 << 6);
    pub const WORK: DayFlags = DayFlags(1 << 7);
    pub const NON_WORK: DayFlags = DayFlags(1 << 8);
    pub const FIRST_WORK: DayFlags = DayFlags(1 << 9);
    pub const BST: DayFlags = DayFlags(1 << 10);
    pub const GMT: DayFlags = DayFlags(1 << 11);
    pub const NON_FIRST_WORK: DayFlags = DayFlags(1 << 12);

    pub const ALL_DAYS: DayFlags = DayFlags(0x7F);
    pub const SEASONS: DayFlags = DayFlags(Self::BST.0 | Self::GMT.0);

    /// Weekday flag, indexed from Sunday.
    const WEEKDAYS: [DayFlags; 7] = [
        Self::SUN,
        Self::MON,
        Self::TUE,
        Self::WED,
        Self::THU,
        Self::FRI,
        Self::SAT,
    ];

    pub fn contains(self, other: DayFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: DayFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for DayFlags {
    type Output = DayFlags;

    fn bitor(self, rhs: DayFlags) -> DayFlags {
        DayFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for DayFlags {
    fn bitor_assign(&mut self, rhs: DayFlags) {
        self.0 |= rhs.0;
    }
}

/// Source of sunrise/sunset offsets (seconds after midnight) for a
/// zero-based day of the year.
pub trait Daylight {
    fn sun_times(&self, day_of_year: u32) -> (i32, i32);
}

/// Linear interpolation over a fixed table of observed times for the south
/// coast of England.
#[derive(Debug, Default, Clone, Copy)]
pub struct PooleTable;

const fn hm(hour: i32, minute: i32) -> i32 {
    hour * 3600 + minute * 60
}

const JAN: i32 = -1;
const FEB: i32 = JAN + 31;
const MAR: i32 = FEB + 29;
const APR: i32 = MAR + 31;
const MAY: i32 = APR + 30;
const JUN: i32 = MAY + 31;
const JUL: i32 = JUN + 30;
const AUG: i32 = JUL + 31;
const SEP: i32 = AUG + 31;
const OCT: i32 = SEP + 30;
const NOV: i32 = OCT + 31;
const DEC: i32 = NOV + 30;

/// `(day of year, sunrise, sunset)`
const POOLE: [(i32, i32, i32); 25] = [
    (JAN + 1, hm(8, 10), hm(16, 13)),
    (JAN + 15, hm(8, 4), hm(16, 31)),
    (FEB + 1, hm(7, 44), hm(16, 59)),
    (FEB + 15, hm(7, 21), hm(17, 24)),
    (MAR + 1, hm(6, 52), hm(17, 49)),
    (MAR + 15, hm(6, 22), hm(18, 12)),
    (APR + 1, hm(5, 44), hm(18, 40)),
    (APR + 15, hm(5, 14), hm(19, 3)),
    (MAY + 1, hm(4, 43), hm(19, 28)),
    (MAY + 15, hm(4, 20), hm(19, 50)),
    (JUN + 1, hm(4, 1), hm(20, 11)),
    (JUN + 15, hm(3, 54), hm(20, 22)),
    (JUL + 1, hm(3, 59), hm(20, 24)),
    (JUL + 15, hm(4, 12), hm(20, 15)),
    (AUG + 1, hm(4, 34), hm(19, 53)),
    (AUG + 15, hm(4, 55), hm(19, 28)),
    (SEP + 1, hm(5, 21), hm(18, 53)),
    (SEP + 15, hm(5, 43), hm(18, 22)),
    (OCT + 1, hm(6, 8), hm(17, 46)),
    (OCT + 15, hm(6, 30), hm(17, 46)),
    (NOV + 1, hm(6, 59), hm(17, 16)),
    (NOV + 15, hm(7, 23), hm(16, 43)),
    (DEC + 1, hm(7, 47), hm(16, 22)),
    (DEC + 15, hm(8, 3), hm(16, 3)),
    (DEC + 31, hm(8, 10), hm(16, 13)),
];

impl Daylight for PooleTable {
    fn sun_times(&self, day_of_year: u32) -> (i32, i32) {
        let day = day_of_year as i32;
        let mut i = 1;
        while i < POOLE.len() - 1 && day > POOLE[i].0 {
            i += 1;
        }
        let (d0, rise0, set0) = POOLE[i - 1];
        let (d1, rise1, set1) = POOLE[i];
        let lerp = |a: i32, b: i32| a + (day - d0) * (b - a) / (d1 - d0);
        (lerp(rise0, rise1), lerp(set0, set1))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub sunrise: i32,
    pub sunset: i32,
    pub flags: DayFlags,
}

impl CalendarDay {
    /// Seconds from 1970-01-01 to this day's midnight.
    pub fn epoch_seconds(&self) -> i64 {
        epoch_days(self.date) * SECONDS_PER_DAY
    }
}

#[derive(Debug, Clone)]
pub struct Calendar {
    start: NaiveDate,
    days: Vec<CalendarDay>,
}

impl Calendar {
    pub fn new(start: NaiveDate, daylight: &dyn Daylight) -> Self {
        let days = start
            .iter_days()
            .take(WINDOW_DAYS)
            .map(|date| {
                let (sunrise, sunset) = daylight.sun_times(date.ordinal0());
                let weekday = date.weekday().num_days_from_sunday() as usize;
                let mut flags = DayFlags::WEEKDAYS[weekday];
                if flags == DayFlags::SAT || flags == DayFlags::SUN {
                    flags |= DayFlags::NON_WORK;
                }
                CalendarDay {
                    date,
                    sunrise,
                    sunset,
                    flags,
                }
            })
            .collect();
        Self { start, days }
    }

    /// Window anchored `BACKTRACK_DAYS` before `today`.
    pub fn around(today: NaiveDate) -> Self {
        Self::new(today - Duration::days(BACKTRACK_DAYS), &PooleTable)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn days(&self) -> &[CalendarDay] {
        &self.days
    }

    /// ORs `flags` into `date`; returns `false` when the date is outside the
    /// window.
    pub fn set_day(&mut self, date: NaiveDate, flags: DayFlags) -> bool {
        let index = (date - self.start).num_days();
        match usize::try_from(index).ok().and_then(|i| self.days.get_mut(i)) {
            Some(day) => {
                day.flags |= flags;
                true
            }
            None => false,
        }
    }

    pub fn has_season_changes(&self) -> bool {
        self.days.iter().any(|d| d.flags.intersects(DayFlags::SEASONS))
    }

    /// Derives working-day and season flags.  Returns `false` when no
    /// BST/GMT changeover was declared, in which case no season flags are
    /// filled in.
    pub fn complete(&mut self) -> bool {
        // The season before the first changeover is the one it ends.
        let mut season = self
            .days
            .iter()
            .find_map(|d| {
                if d.flags.intersects(DayFlags::BST) {
                    Some(DayFlags::GMT)
                } else if d.flags.intersects(DayFlags::GMT) {
                    Some(DayFlags::BST)
                } else {
                    None
                }
            })
            .unwrap_or(DayFlags::NONE);
        let seasons_defined = season != DayFlags::NONE;

        let mut previous_non_work = false;
        for (i, day) in self.days.iter_mut().enumerate() {
            if !day.flags.intersects(DayFlags::NON_WORK) {
                day.flags |= DayFlags::WORK;
                if i > 0 && previous_non_work {
                    day.flags |= DayFlags::FIRST_WORK;
                } else {
                    day.flags |= DayFlags::NON_FIRST_WORK;
                }
            }
            previous_non_work = day.flags.intersects(DayFlags::NON_WORK);

            if day.flags.intersects(DayFlags::SEASONS) {
                season = DayFlags(day.flags.0 & DayFlags::SEASONS.0);
            } else {
                day.flags |= season;
            }
        }
        seasons_defined
    }
}

pub fn epoch_days(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_CE_DAYS
}

pub fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    let ce = i32::try_from(days + UNIX_EPOCH_CE_DAYS).ok()?;
    NaiveDate::from_num_days_from_ce_opt(ce)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_spans_just_over_two_years() {
        let cal = Calendar::around(date(2024, 3, 3));
        assert_eq!(cal.days().len(), WINDOW_DAYS);
        assert_eq!(cal.start(), date(2024, 3, 1));
        assert_eq!(cal.days()[2].date, date(2024, 3, 3));
    }

    #[test]
    fn weekends_are_non_working() {
        // 2024-03-02 is a Saturday
        let cal = Calendar::new(date(2024, 3, 1), &PooleTable);
        let fri = cal.days()[0].flags;
        let sat = cal.days()[1].flags;
        let sun = cal.days()[2].flags;
        assert_eq!(fri, DayFlags::FRI);
        assert_eq!(sat, DayFlags::SAT | DayFlags::NON_WORK);
        assert_eq!(sun, DayFlags::SUN | DayFlags::NON_WORK);
    }

    #[test]
    fn poole_table_hits_its_sample_points() {
        let test_cases = vec![
            (0, hm(8, 10), hm(16, 13)),
            (JUN as u32 + 15, hm(3, 54), hm(20, 22)),
            (365, hm(8, 10), hm(16, 13)),
        ];
        for (day, rise, set) in test_cases {
            assert_eq!(PooleTable.sun_times(day), (rise, set), "day {day}");
        }
        // halfway between JAN+1 and JAN+15
        let (rise, _) = PooleTable.sun_times(7);
        assert_eq!(rise, hm(8, 7));
    }

    #[test]
    fn complete_derives_working_and_season_flags() {
        let mut cal = Calendar::new(date(2024, 3, 1), &PooleTable);
        assert!(cal.set_day(date(2024, 3, 4), DayFlags::NON_WORK)); // Monday holiday
        assert!(cal.set_day(date(2024, 3, 31), DayFlags::BST));
        assert!(cal.complete());

        let day = |d: NaiveDate| cal.days()[(d - cal.start()).num_days() as usize].flags;
        assert!(day(date(2024, 3, 1)).contains(DayFlags::WORK | DayFlags::GMT));
        assert!(!day(date(2024, 3, 4)).intersects(DayFlags::WORK));
        assert!(day(date(2024, 3, 5)).contains(DayFlags::FIRST_WORK));
        assert!(day(date(2024, 3, 6)).contains(DayFlags::NON_FIRST_WORK));
        assert!(day(date(2024, 4, 1)).contains(DayFlags::BST));
        assert!(!day(date(2024, 4, 1)).intersects(DayFlags::GMT));
    }

    #[test]
    fn complete_without_changeovers_reports_it() {
        let mut cal = Calendar::new(date(2024, 3, 1), &PooleTable);
        assert!(!cal.set_day(date(2020, 1, 1), DayFlags::BST));
        assert!(!cal.complete());
        assert!(!cal.days().iter().any(|d| d.flags.intersects(DayFlags::SEASONS)));
    }

    #[test]
    fn epoch_day_conversions() {
        assert_eq!(epoch_days(date(1970, 1, 1)), 0);
        assert_eq!(epoch_days(date(1970, 1, 2)), 1);
        assert_eq!(date_from_epoch_days(19_783), Some(date(2024, 3, 1)));
        let cal = Calendar::new(date(1970, 1, 2), &PooleTable);
        assert_eq!(cal.days()[0].epoch_seconds(), 86_400);
    }
}
