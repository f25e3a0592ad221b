use chrono::{Datelike, NaiveDate, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, fmt};

/// A daily mood from 0 (worst) to 4 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct MoodCode(u8);

impl MoodCode {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 4;

    pub const ALL: [MoodCode; 5] = [MoodCode(0), MoodCode(1), MoodCode(2), MoodCode(3), MoodCode(4)];

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn emoji(self) -> &'static str {
        ["😫", "😟", "😐", "🙂", "😊"][usize::from(self.0)]
    }
}

impl Default for MoodCode {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for MoodCode {
    type Error = InvalidMoodCode;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(InvalidMoodCode(value))
    }
}

impl From<MoodCode> for u8 {
    fn from(code: MoodCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMoodCode(pub i64);

impl fmt::Display for InvalidMoodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mood must be between {} and {}, got {}",
            MoodCode::MIN,
            MoodCode::MAX,
            self.0
        )
    }
}

impl std::error::Error for InvalidMoodCode {}

/// Formats a date as its `yyyy-MM-dd` log key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Years whose keys are exactly four digits, so key order is date order.
const KEY_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

pub fn has_date_key(date: NaiveDate) -> bool {
    KEY_YEARS.contains(&date.year())
}

/// Parses a strict, zero-padded `yyyy-MM-dd` key in years 0001..=9999.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 || !value.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .filter(|date| has_date_key(*date) && date_key(*date) == value)
}

fn clamp_to_keys(date: NaiveDate) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(*KEY_YEARS.start(), 1, 1).unwrap_or(date);
    let last = NaiveDate::from_ymd_opt(*KEY_YEARS.end(), 12, 31).unwrap_or(date);
    date.clamp(first, last)
}

/// One user's moods keyed by date. Keys sort lexicographically, which for
/// `yyyy-MM-dd` is also chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MoodLog {
    entries: BTreeMap<String, MoodCode>,
}

impl<'de> Deserialize<'de> for MoodLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, MoodCode>::deserialize(deserializer)?;
        if let Some(key) = entries.keys().find(|key| parse_date_key(key).is_none()) {
            return Err(de::Error::custom(format!("invalid date key '{key}'")));
        }
        Ok(MoodLog { entries })
    }
}

impl MoodLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dates outside years 0001..=9999 have no key and are not stored.
    pub fn insert(&mut self, date: NaiveDate, mood: MoodCode) -> Option<MoodCode> {
        if !has_date_key(date) {
            return None;
        }
        self.entries.insert(date_key(date), mood)
    }

    pub fn get(&self, date: NaiveDate) -> Option<MoodCode> {
        self.entries.get(&date_key(date)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MoodCode)> + '_ {
        self.entries.iter().map(|(date, mood)| (date.as_str(), *mood))
    }

    pub fn moods(&self) -> impl Iterator<Item = MoodCode> + '_ {
        self.entries.values().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next().and_then(|key| parse_date_key(key))
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.keys().next_back().and_then(|key| parse_date_key(key))
    }

    /// A copy holding only the entries inside `range`.
    pub fn within(&self, range: &DateRange) -> MoodLog {
        let entries = self
            .entries
            .range(date_key(clamp_to_keys(range.start()))..=date_key(clamp_to_keys(range.end())))
            .map(|(date, mood)| (date.clone(), *mood))
            .collect();
        MoodLog { entries }
    }

    pub fn records(&self) -> Vec<MoodRecord> {
        self.iter()
            .map(|(date, value)| MoodRecord {
                date: date.to_string(),
                value,
            })
            .collect()
    }
}

impl FromIterator<(NaiveDate, MoodCode)> for MoodLog {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, MoodCode)>>(iter: I) -> Self {
        let mut log = MoodLog::new();
        for (date, mood) in iter {
            log.insert(date, mood);
        }
        log
    }
}

/// Inclusive calendar range; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |date| *date <= end)
    }
}

/// Reporting period selectable on the analysis views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Month,
    Year,
    All,
}

impl Period {
    /// The calendar month or year containing `today`; `None` for all time.
    pub fn range_at(self, today: NaiveDate) -> Option<DateRange> {
        let (start, end) = match self {
            Period::Month => {
                let start = today.with_day(1)?;
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
                };
                (start, next_month.pred_opt()?)
            }
            Period::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(today.year(), 12, 31)?,
            ),
            Period::All => return None,
        };
        DateRange::new(start, end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekdayBucket {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl From<Weekday> for WeekdayBucket {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => WeekdayBucket::Sun,
            Weekday::Mon => WeekdayBucket::Mon,
            Weekday::Tue => WeekdayBucket::Tue,
            Weekday::Wed => WeekdayBucket::Wed,
            Weekday::Thu => WeekdayBucket::Thu,
            Weekday::Fri => WeekdayBucket::Fri,
            Weekday::Sat => WeekdayBucket::Sat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadMoodRun {
    pub start_date: String,
    pub end_date: String,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub mood: Option<MoodCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodPatterns {
    pub most_common_mood: MoodCode,
    pub mood_variability: f64,
    pub improvement_trend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCount {
    pub mood: MoodCode,
    pub emoji: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub period: Period,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub entry_count: usize,
    pub average_mood: f64,
    pub mood_counts: Vec<MoodCount>,
    pub by_weekday: BTreeMap<WeekdayBucket, f64>,
    pub bad_mood_runs: Vec<BadMoodRun>,
    pub patterns: MoodPatterns,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodRecord {
    pub date: String,
    pub value: MoodCode,
}

#[derive(Debug, Deserialize)]
pub struct MoodRequest {
    pub date: String,
    #[serde(alias = "mood")]
    pub value: MoodCode,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: Period,
    pub threshold: Option<u8>,
    pub min_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: String,
    pub salt: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: String,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// Everything persisted to the data file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    /// Bearer token to the session it opened.
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    /// User id to that user's moods.
    #[serde(default)]
    pub moods: BTreeMap<String, MoodLog>,
}
