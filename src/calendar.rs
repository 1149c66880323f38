//! Game-day bucketing. Free-play days roll over at 03:00 UTC rather than at midnight.

use std::{fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, UtcOffset, macros::format_description};

/// Shift applied to a UTC instant before truncating it to a calendar date.
pub const GAME_DAY_OFFSET: Duration = Duration::hours(3);

/// Calendar date identifying one free-play day, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GameDay(Date);

impl GameDay {
    /// Game day containing `instant`.
    pub fn containing(instant: OffsetDateTime) -> Self {
        GameDay((instant.to_offset(UtcOffset::UTC) - GAME_DAY_OFFSET).date())
    }

    /// Game day containing a [`SystemTime`].
    pub fn containing_system_time(instant: SystemTime) -> Self {
        Self::containing(OffsetDateTime::from(instant))
    }

    /// Current game day.
    pub fn today() -> Self {
        Self::containing(OffsetDateTime::now_utc())
    }

    /// Underlying calendar date.
    pub fn date(&self) -> Date {
        self.0
    }

    /// First instant of the game day (03:00 UTC on its date).
    pub fn starts_at(&self) -> OffsetDateTime {
        self.0.midnight().assume_utc() + GAME_DAY_OFFSET
    }

    /// The game day before this one.
    pub fn previous(&self) -> Option<Self> {
        self.0.previous_day().map(GameDay)
    }
}

impl From<Date> for GameDay {
    fn from(date: Date) -> Self {
        GameDay(date)
    }
}

impl fmt::Display for GameDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

/// Error returned when a string is not a `YYYY-MM-DD` date.
#[derive(Debug, thiserror::Error)]
#[error("invalid game day `{0}`")]
pub struct InvalidGameDay(String);

impl FromStr for GameDay {
    type Err = InvalidGameDay;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Date::parse(value, format_description!("[year]-[month]-[day]"))
            .map(GameDay)
            .map_err(|_| InvalidGameDay(value.to_owned()))
    }
}

impl From<GameDay> for String {
    fn from(day: GameDay) -> Self {
        day.to_string()
    }
}

impl TryFrom<String> for GameDay {
    type Error = InvalidGameDay;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Same wall-clock instant one calendar month earlier, clamping to the month's last day.
pub fn one_month_before(instant: OffsetDateTime) -> OffsetDateTime {
    let date = instant.date();
    let (year, month) = match date.month() {
        time::Month::January => (date.year() - 1, time::Month::December),
        other => (date.year(), other.previous()),
    };

    (0..4)
        .filter_map(|back| Date::from_calendar_date(year, month, date.day() - back).ok())
        .next()
        .map(|target| instant.replace_date(target))
        .unwrap_or(instant - Duration::days(30))
}
