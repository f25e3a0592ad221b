//! Descriptive statistics over a single user's [`MoodLog`].
//!
//! Every function here is pure: it reads the log it is given and returns a
//! fresh value. Empty input yields zeroed results rather than errors.

use crate::models::{
    date_key, parse_date_key, BadMoodRun, DateRange, MoodCode, MoodCount, MoodLog, MoodPatterns,
    Period, SeriesPoint, StatsResponse, WeekdayBucket,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

/// Codes at or below this count as a bad day.
pub const DEFAULT_BAD_MOOD_THRESHOLD: u8 = 1;
pub const DEFAULT_MIN_RUN_LENGTH: usize = 3;

/// Longest span a day series may cover.
pub const MAX_SERIES_DAYS: i64 = 3660;

/// Mean of every code in `log`, or 0 when the log is empty.
///
/// A 0 here means "no data", not "worst mood". Filter the log first with
/// [`MoodLog::within`] to average a period.
pub fn average_mood(log: &MoodLog) -> f64 {
    mean(log.moods())
}

/// One point per day of `range`, oldest first. Days without an entry carry
/// `None` so charts can tell a gap from a 0.
pub fn mood_series_for_range(log: &MoodLog, range: &DateRange) -> Vec<SeriesPoint> {
    range
        .days()
        .map(|date| SeriesPoint {
            date: date_key(date),
            mood: log.get(date),
        })
        .collect()
}

/// Mean code per weekday. Weekdays with no entries are left out.
pub fn average_by_weekday(log: &MoodLog) -> BTreeMap<WeekdayBucket, f64> {
    let mut buckets: BTreeMap<WeekdayBucket, (u64, u64)> = BTreeMap::new();
    for (date, mood) in log.iter() {
        let Some(date) = parse_date_key(date) else {
            continue;
        };
        let (sum, count) = buckets.entry(date.weekday().into()).or_default();
        *sum += u64::from(mood.value());
        *count += 1;
    }

    buckets
        .into_iter()
        .map(|(weekday, (sum, count))| (weekday, sum as f64 / count as f64))
        .collect()
}

/// Runs of logged days whose code is at most `threshold`, kept when at
/// least `min_length` entries long.
///
/// Runs follow consecutive *entries*, not consecutive calendar days: an
/// unlogged day between two bad days does not break the run.
pub fn detect_bad_mood_runs(log: &MoodLog, threshold: u8, min_length: usize) -> Vec<BadMoodRun> {
    let mut runs = Vec::new();
    let mut current: Option<BadMoodRun> = None;

    for (date, mood) in log.iter() {
        if mood.value() <= threshold {
            match current.as_mut() {
                Some(run) => {
                    run.end_date = date.to_string();
                    run.length += 1;
                }
                None => {
                    current = Some(BadMoodRun {
                        start_date: date.to_string(),
                        end_date: date.to_string(),
                        length: 1,
                    });
                }
            }
        } else if let Some(run) = current.take() {
            if run.length >= min_length {
                runs.push(run);
            }
        }
    }

    if let Some(run) = current {
        if run.length >= min_length {
            runs.push(run);
        }
    }

    runs
}

/// Most frequent code, population standard deviation, and whether the
/// later half of the log averages strictly higher than the earlier half.
///
/// Ties for the most frequent code go to the lowest code. For an odd
/// number of entries the later half is the larger one.
pub fn analyze_mood_patterns(log: &MoodLog) -> MoodPatterns {
    if log.is_empty() {
        return MoodPatterns {
            most_common_mood: MoodCode::default(),
            mood_variability: 0.0,
            improvement_trend: false,
        };
    }

    let counts = count_by_mood(log);
    let most_common_mood = counts
        .iter()
        .fold(None::<&MoodCount>, |best, candidate| match best {
            Some(best) if best.count >= candidate.count => Some(best),
            _ => Some(candidate),
        })
        .map(|count| count.mood)
        .unwrap_or_default();

    let mean_value = average_mood(log);
    let variance = log
        .moods()
        .map(|mood| (f64::from(mood.value()) - mean_value).powi(2))
        .sum::<f64>()
        / log.len() as f64;

    let split = log.len() / 2;
    let improvement_trend = if split == 0 {
        false
    } else {
        let first_half = mean(log.moods().take(split));
        let second_half = mean(log.moods().skip(split));
        second_half > first_half
    };

    MoodPatterns {
        most_common_mood,
        mood_variability: variance.sqrt(),
        improvement_trend,
    }
}

/// Occurrences of each code, always all five in ascending order.
pub fn count_by_mood(log: &MoodLog) -> Vec<MoodCount> {
    let mut counts = [0u64; MoodCode::ALL.len()];
    for mood in log.moods() {
        counts[usize::from(mood.value())] += 1;
    }

    MoodCode::ALL
        .iter()
        .zip(counts)
        .map(|(mood, count)| MoodCount {
            mood: *mood,
            emoji: mood.emoji().to_string(),
            count,
        })
        .collect()
}

pub fn build_stats(log: &MoodLog, period: Period, threshold: u8, min_length: usize) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), log, period, threshold, min_length)
}

pub fn build_stats_at(
    today: NaiveDate,
    log: &MoodLog,
    period: Period,
    threshold: u8,
    min_length: usize,
) -> StatsResponse {
    let range = period.range_at(today);
    let scoped = match &range {
        Some(range) => log.within(range),
        None => log.clone(),
    };

    // All-time series spans the logged dates, keeping only the most recent
    // MAX_SERIES_DAYS of them.
    let series_range = range.or_else(|| {
        let last = scoped.last_date()?;
        let earliest = last - Duration::days(MAX_SERIES_DAYS - 1);
        DateRange::new(scoped.first_date()?.max(earliest), last)
    });
    let series = series_range
        .map(|range| mood_series_for_range(&scoped, &range))
        .unwrap_or_default();

    StatsResponse {
        period,
        start_date: range.map(|range| date_key(range.start())),
        end_date: range.map(|range| date_key(range.end())),
        entry_count: scoped.len(),
        average_mood: average_mood(&scoped),
        mood_counts: count_by_mood(&scoped),
        by_weekday: average_by_weekday(&scoped),
        bad_mood_runs: detect_bad_mood_runs(&scoped, threshold, min_length),
        patterns: analyze_mood_patterns(&scoped),
        series,
    }
}

fn mean(moods: impl Iterator<Item = MoodCode>) -> f64 {
    let (sum, count) = moods.fold((0u64, 0u64), |(sum, count), mood| {
        (sum + u64::from(mood.value()), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn code(value: u8) -> MoodCode {
        MoodCode::new(value).unwrap()
    }

    fn log_of(entries: &[(&str, u8)]) -> MoodLog {
        entries
            .iter()
            .map(|(date, mood)| (parse_date_key(date).unwrap(), code(*mood)))
            .collect()
    }

    #[test]
    fn average_of_empty_log_is_zero() {
        assert_eq!(average_mood(&MoodLog::new()), 0.0);
        assert_eq!(average_mood(&log_of(&[("2024-01-01", 4), ("2024-01-02", 0)])), 2.0);
    }

    #[test]
    fn average_stays_within_code_bounds() {
        let log = log_of(&[
            ("2024-03-01", 4),
            ("2024-03-02", 4),
            ("2024-03-05", 3),
            ("2024-03-09", 0),
        ]);
        let average = average_mood(&log);
        assert!((0.0..=4.0).contains(&average));
        assert_eq!(average, 2.75);
    }

    #[test]
    fn series_has_one_point_per_day_with_gaps_marked() {
        let log = log_of(&[("2024-01-30", 0), ("2024-02-02", 3)]);
        let range = DateRange::new(day(2024, 1, 29), day(2024, 2, 3)).unwrap();
        let series = mood_series_for_range(&log, &range);

        assert_eq!(series.len() as i64, range.num_days());
        assert!(series.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert_eq!(series[0].date, "2024-01-29");
        assert_eq!(series[0].mood, None);
        assert_eq!(series[1].mood, Some(code(0)));
        assert_eq!(series[4].mood, Some(code(3)));
        assert_eq!(series[5].date, "2024-02-03");
    }

    #[test]
    fn series_for_single_day_range() {
        let range = DateRange::new(day(2024, 5, 5), day(2024, 5, 5)).unwrap();
        let series = mood_series_for_range(&MoodLog::new(), &range);
        assert_eq!(series, vec![SeriesPoint { date: "2024-05-05".into(), mood: None }]);
    }

    #[test]
    fn weekday_averages_omit_missing_days() {
        // 2024-01-01 is a Monday.
        let log = log_of(&[("2024-01-01", 1), ("2024-01-08", 3), ("2024-01-02", 4)]);
        let averages = average_by_weekday(&log);

        assert_eq!(averages.len(), 2);
        assert_eq!(averages.get(&WeekdayBucket::Mon), Some(&2.0));
        assert_eq!(averages.get(&WeekdayBucket::Tue), Some(&4.0));
        assert!(!averages.contains_key(&WeekdayBucket::Sat));
    }

    #[test]
    fn bad_runs_bridge_unlogged_days() {
        let log = log_of(&[("2024-01-01", 0), ("2024-01-02", 1), ("2024-01-04", 0)]);

        let runs = detect_bad_mood_runs(&log, 1, 3);
        assert_eq!(
            runs,
            vec![BadMoodRun {
                start_date: "2024-01-01".into(),
                end_date: "2024-01-04".into(),
                length: 3,
            }]
        );

        assert!(detect_bad_mood_runs(&log, 1, 4).is_empty());
    }

    #[test]
    fn bad_runs_close_on_good_day() {
        let log = log_of(&[
            ("2024-02-01", 0),
            ("2024-02-02", 0),
            ("2024-02-03", 0),
            ("2024-02-04", 3),
            ("2024-02-05", 1),
            ("2024-02-06", 1),
            ("2024-02-07", 2),
            ("2024-02-08", 0),
            ("2024-02-09", 1),
            ("2024-02-10", 0),
            ("2024-02-11", 1),
        ]);

        let runs = detect_bad_mood_runs(
            &log,
            DEFAULT_BAD_MOOD_THRESHOLD,
            DEFAULT_MIN_RUN_LENGTH,
        );
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].start_date, "2024-02-01");
        assert_eq!(runs[0].end_date, "2024-02-03");
        assert_eq!(runs[1].start_date, "2024-02-08");
        assert_eq!(runs[1].end_date, "2024-02-11");
        assert_eq!(runs[1].length, 4);

        let strict = detect_bad_mood_runs(&log, 0, 1);
        assert_eq!(strict.len(), 3);
        assert_eq!(strict[1].length, 1);
    }

    #[test]
    fn patterns_for_two_entries() {
        let patterns = analyze_mood_patterns(&log_of(&[("2024-01-01", 0), ("2024-01-02", 4)]));
        assert_eq!(patterns.mood_variability, 2.0);
        assert!(patterns.improvement_trend);
        assert_eq!(patterns.most_common_mood, code(0));
    }

    #[test]
    fn patterns_for_empty_log() {
        let patterns = analyze_mood_patterns(&MoodLog::new());
        assert_eq!(
            patterns,
            MoodPatterns {
                most_common_mood: code(0),
                mood_variability: 0.0,
                improvement_trend: false,
            }
        );
    }

    #[test]
    fn most_common_mood_prefers_highest_count_then_lowest_code() {
        let log = log_of(&[
            ("2024-01-01", 3),
            ("2024-01-02", 3),
            ("2024-01-03", 1),
            ("2024-01-04", 1),
            ("2024-01-05", 4),
        ]);
        assert_eq!(analyze_mood_patterns(&log).most_common_mood, code(1));

        let log = log_of(&[("2024-01-01", 2), ("2024-01-02", 4), ("2024-01-03", 4)]);
        assert_eq!(analyze_mood_patterns(&log).most_common_mood, code(4));
    }

    #[test]
    fn trend_uses_larger_second_half_and_strict_comparison() {
        // First half [2], second half [2, 2]: equal means are not an improvement.
        let flat = log_of(&[("2024-01-01", 2), ("2024-01-02", 2), ("2024-01-03", 2)]);
        assert!(!analyze_mood_patterns(&flat).improvement_trend);

        // First half [1], second half [1, 4].
        let rising = log_of(&[("2024-01-01", 1), ("2024-01-02", 1), ("2024-01-03", 4)]);
        assert!(analyze_mood_patterns(&rising).improvement_trend);

        // A single entry has no first half to compare against.
        let single = log_of(&[("2024-01-01", 4)]);
        let patterns = analyze_mood_patterns(&single);
        assert!(!patterns.improvement_trend);
        assert_eq!(patterns.mood_variability, 0.0);
    }

    #[test]
    fn count_by_mood_lists_every_code() {
        let counts = count_by_mood(&log_of(&[("2024-01-01", 4), ("2024-01-02", 4)]));
        let values: Vec<u64> = counts.iter().map(|count| count.count).collect();
        assert_eq!(values, [0, 0, 0, 0, 2]);
        assert_eq!(counts[4].emoji, "😊");
    }

    #[test]
    fn repeated_calls_return_identical_results() {
        let log = log_of(&[("2024-01-01", 0), ("2024-01-03", 4), ("2024-01-06", 2)]);
        let range = DateRange::new(day(2024, 1, 1), day(2024, 1, 7)).unwrap();
        let before = log.clone();

        assert_eq!(average_mood(&log), average_mood(&log));
        assert_eq!(mood_series_for_range(&log, &range), mood_series_for_range(&log, &range));
        assert_eq!(average_by_weekday(&log), average_by_weekday(&log));
        assert_eq!(detect_bad_mood_runs(&log, 1, 1), detect_bad_mood_runs(&log, 1, 1));
        assert_eq!(analyze_mood_patterns(&log), analyze_mood_patterns(&log));
        assert_eq!(log, before);
    }

    #[test]
    fn stats_for_month_scope_to_that_month() {
        let log = log_of(&[("2024-01-31", 0), ("2024-02-01", 4), ("2024-02-03", 2)]);
        let stats = build_stats_at(day(2024, 2, 10), &log, Period::Month, 1, 3);

        assert_eq!(stats.start_date.as_deref(), Some("2024-02-01"));
        assert_eq!(stats.end_date.as_deref(), Some("2024-02-29"));
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.average_mood, 3.0);
        assert_eq!(stats.series.len(), 29);
        assert_eq!(stats.series[0].mood, Some(code(4)));
    }

    #[test]
    fn stats_for_all_time_span_logged_dates() {
        let log = log_of(&[("2023-12-30", 1), ("2024-01-02", 3)]);
        let stats = build_stats_at(day(2024, 6, 1), &log, Period::All, 1, 3);

        assert_eq!(stats.start_date, None);
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.series.len(), 4);
        assert_eq!(stats.series[3].date, "2024-01-02");

        let wide = log_of(&[("0001-01-01", 2), ("9999-12-31", 2)]);
        let stats = build_stats_at(day(2024, 6, 1), &wide, Period::All, 1, 3);
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.series.len() as i64, MAX_SERIES_DAYS);
        assert_eq!(stats.series.last().unwrap().date, "9999-12-31");
        assert_eq!(stats.series.last().unwrap().mood, Some(code(2)));
        assert_eq!(stats.series[0].mood, None);

        let empty = build_stats_at(day(2024, 6, 1), &MoodLog::new(), Period::All, 1, 3);
        assert!(empty.series.is_empty());
        assert_eq!(empty.average_mood, 0.0);
        assert!(empty.by_weekday.is_empty());
    }
}
