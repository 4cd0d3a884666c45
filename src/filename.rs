use crate::errors::{AppError, AppResult};
use crate::models::CaptureName;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub const CAPTURE_EXTENSION: &str = "csv";
pub const USER_SEPARATOR: char = '_';
pub const MORNING_MARKER: &str = "오전";
pub const AFTERNOON_MARKER: &str = "오후";
pub const MIN_YEAR: i32 = 1;

// "2025. 12. 4. 오후 11-50-53"
static CAPTURE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})\.\s*([0-9]{1,2})\.\s*([0-9]{1,2})\.",
        r"\s*(오전|오후)\s*([0-9]{1,2})-([0-9]{2})-([0-9]{2})$",
    ))
    .expect("valid regex")
});

/// True when the path carries the capture extension (ASCII case-insensitive).
pub fn has_capture_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CAPTURE_EXTENSION))
}

/// Parses `<user>_<YYYY>. <M>. <D>. <오전|오후> <H>-<MM>-<SS>.csv`.
///
/// Only the basename is considered. The user segment ends at the first `_`,
/// so it never contains the separator itself.
pub fn parse_capture_filename(name: &str) -> AppResult<CaptureName> {
    let base = Path::new(name)
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| AppError::Format(format!("Not a file name: {}", name)))?;

    let stem = strip_capture_extension(base)
        .ok_or_else(|| AppError::Format(format!("Not a CSV file: {}", base)))?;

    let Some((user_id, rest)) = stem.split_once(USER_SEPARATOR) else {
        return Err(AppError::Format(format!(
            "Missing '{}' between user and timestamp: {}",
            USER_SEPARATOR, base
        )));
    };
    if user_id.is_empty() {
        return Err(AppError::Format(format!("Empty user segment: {}", base)));
    }

    let captured_at = parse_capture_timestamp(rest.trim())
        .map_err(|error| AppError::Format(format!("{} ({})", error, base)))?;

    Ok(CaptureName {
        user_id: user_id.to_string(),
        captured_at,
    })
}

fn strip_capture_extension(base: &str) -> Option<&str> {
    let (stem, ext) = base.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(CAPTURE_EXTENSION).then_some(stem)
}

fn parse_capture_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let caps = CAPTURE_TIMESTAMP
        .captures(raw)
        .ok_or_else(|| format!("Unexpected datetime format '{}'", raw))?;

    let number = |index: usize| -> Result<u32, String> {
        caps.get(index)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .parse::<u32>()
            .map_err(|error| format!("Invalid number in '{}': {}", raw, error))
    };

    let year = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse::<i32>()
        .map_err(|error| format!("Invalid year in '{}': {}", raw, error))?;
    let month = number(2)?;
    let day = number(3)?;
    let marker = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
    let hour = to_24_hour(marker, number(5)?);
    let minute = number(6)?;
    let second = number(7)?;

    let date = Some(year)
        .filter(|year| *year >= MIN_YEAR)
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(|| format!("Invalid calendar date {}-{}-{}", year, month, day))?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| format!("Invalid time {}:{:02}:{:02}", hour, minute, second))?;
    Ok(NaiveDateTime::new(date, time))
}

fn to_24_hour(marker: &str, hour: u32) -> u32 {
    if marker == MORNING_MARKER {
        if hour == 12 {
            0
        } else {
            hour
        }
    } else if hour == 12 {
        12
    } else {
        hour + 12
    }
}

#[cfg(test)]
mod tests {
    use super::{has_capture_extension, parse_capture_filename, AFTERNOON_MARKER, MORNING_MARKER};
    use chrono::{NaiveDate, NaiveDateTime, Timelike};
    use std::path::Path;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid fixture timestamp")
    }

    fn hour_of(name: &str) -> u32 {
        parse_capture_filename(name).expect("parses").captured_at.hour()
    }

    #[test]
    fn parses_afternoon_capture() {
        let parsed = parse_capture_filename("영준정_2025. 12. 4. 오후 11-50-53.csv").expect("parses");
        assert_eq!(parsed.user_id, "영준정");
        assert_eq!(parsed.captured_at, at(2025, 12, 4, 23, 50, 53));
    }

    #[test]
    fn parses_morning_capture_from_full_path() {
        let parsed =
            parse_capture_filename("/data/early/문지원_2025. 12. 4. 오전 9-48-33.csv").expect("parses");
        assert_eq!(parsed.user_id, "문지원");
        assert_eq!(parsed.captured_at, at(2025, 12, 4, 9, 48, 33));
    }

    #[test]
    fn converts_noon_and_midnight() {
        assert_eq!(hour_of("a_2025. 1. 2. 오전 12-00-00.csv"), 0);
        assert_eq!(hour_of("a_2025. 1. 2. 오후 12-00-00.csv"), 12);
        assert_eq!(hour_of("a_2025. 1. 2. 오전 5-00-00.csv"), 5);
        assert_eq!(hour_of("a_2025. 1. 2. 오후 5-00-00.csv"), 17);
    }

    #[test]
    fn round_trips_generated_names() {
        for (marker, hour12, expected) in [
            (MORNING_MARKER, 12, 0),
            (MORNING_MARKER, 1, 1),
            (MORNING_MARKER, 11, 11),
            (AFTERNOON_MARKER, 12, 12),
            (AFTERNOON_MARKER, 1, 13),
            (AFTERNOON_MARKER, 11, 23),
        ] {
            let name = format!("학생{}_2024. 9. 11. {} {}-07-05.csv", hour12, marker, hour12);
            let parsed = parse_capture_filename(&name).expect("parses");
            assert_eq!(parsed.user_id, format!("학생{}", hour12));
            assert_eq!(parsed.captured_at, at(2024, 9, 11, expected, 7, 5));
        }
    }

    #[test]
    fn user_segment_ends_at_first_separator() {
        let error = parse_capture_filename("kim_lee_2025. 1. 2. 오전 1-00-00.csv")
            .expect_err("rest is not a timestamp");
        assert!(error.to_string().starts_with("FORMAT_INVALID"));
    }

    #[test]
    fn rejects_malformed_names() {
        for name in [
            "random.csv",
            "_2025. 1. 2. 오전 1-00-00.csv",
            "kim_2025. 1. 2. 오전 1-00-00.txt",
            "kim_2025. 1. 2. AM 1-00-00.csv",
            "kim_2025-1-2 오전 1-00-00.csv",
            "kim_2025. 1. 2. 오전 1:00:00.csv",
            "kim_2025. 1. 2. 오전 1-0-00.csv",
            "kim_2025. 13. 2. 오전 1-00-00.csv",
            "kim_2025. 2. 30. 오전 1-00-00.csv",
            "kim_0000. 1. 2. 오전 1-00-00.csv",
            "kim_2025. 1. 2. 오후 13-00-00.csv",
            "kim_2025. 1. 2. 오전 1-60-00.csv",
            "kim_2025. 1. 2. 오전 １-00-00.csv",
        ] {
            assert!(parse_capture_filename(name).is_err(), "{} should be rejected", name);
        }
    }

    #[test]
    fn year_zero_is_not_a_calendar_year() {
        let error = parse_capture_filename("kim_0000. 1. 2. 오전 1-00-00.csv").expect_err("year 0");
        assert!(error.to_string().contains("Invalid calendar date"));
        assert!(parse_capture_filename("kim_0001. 1. 2. 오전 1-00-00.csv").is_ok());
    }

    #[test]
    fn tolerates_missing_optional_spaces_and_upper_extension() {
        let parsed = parse_capture_filename("kim_2025.1.2.오후3-04-05.CSV").expect("parses");
        assert_eq!(parsed.captured_at, at(2025, 1, 2, 15, 4, 5));
    }

    #[test]
    fn detects_capture_extension() {
        assert!(has_capture_extension(Path::new("a.csv")));
        assert!(has_capture_extension(Path::new("a.CSV")));
        assert!(!has_capture_extension(Path::new("a.xlsx")));
        assert!(!has_capture_extension(Path::new("csv")));
    }
}
