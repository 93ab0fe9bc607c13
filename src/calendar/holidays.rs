use std::ops::RangeInclusive;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HOLIDAY_YEARS: RangeInclusive<i32> = 2022..=2030;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    Fixed,
    Movable,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HolidayKind,
}

const FIXED_HOLIDAYS: [(u32, u32, &str); 9] = [
    (1, 1, "New Year's Day"),
    (1, 2, "Berchtold's Day"),
    (1, 6, "Epiphany"),
    (5, 1, "Labour Day"),
    (8, 1, "Swiss National Day"),
    (8, 15, "Assumption Day"),
    (11, 1, "All Saints' Day"),
    (12, 25, "Christmas Day"),
    (12, 26, "St. Stephen's Day"),
];

const EASTER_OFFSETS: [(u64, &str); 6] = [
    (0, "Easter Sunday"),
    (1, "Easter Monday"),
    (39, "Ascension Day"),
    (49, "Whit Sunday"),
    (50, "Whit Monday"),
    (60, "Corpus Christi"),
];

/// Gregorian Easter Sunday (anonymous Gregorian / Butcher algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let n = h + l - 7 * m + 114;
    let month = n / 31;
    let day = n % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

pub fn holidays_for_year(year: i32) -> Vec<Holiday> {
    let fixed = FIXED_HOLIDAYS.iter().filter_map(|&(month, day, name)| {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Holiday {
            date,
            name: name.to_string(),
            kind: HolidayKind::Fixed,
        })
    });

    let easter = easter_sunday(year);
    let movable = EASTER_OFFSETS.iter().filter_map(move |&(offset, name)| {
        easter
            .and_then(|sunday| sunday.checked_add_days(Days::new(offset)))
            .map(|date| Holiday {
                date,
                name: name.to_string(),
                kind: HolidayKind::Movable,
            })
    });

    fixed.chain(movable).collect()
}

pub fn generate(years: RangeInclusive<i32>) -> Vec<Holiday> {
    years.flat_map(holidays_for_year).collect()
}

pub fn is_holiday(holidays: &[Holiday], date: NaiveDate) -> bool {
    holidays.iter().any(|holiday| holiday.date == date)
}

/// Reads a holiday list, skipping entries that do not parse.
///
/// Holidays are regenerated on every load, so an unreadable entry must never
/// stop the rest of the document from loading.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Holiday>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(holiday) => Some(holiday),
            Err(e) => {
                tracing::warn!("Skipping unreadable holiday entry: {}", e);
                None
            }
        })
        .collect())
}

pub fn holidays_in_year(holidays: &[Holiday], year: i32) -> impl Iterator<Item = &Holiday> {
    holidays.iter().filter(move |holiday| holiday.date.year() == year)
}
