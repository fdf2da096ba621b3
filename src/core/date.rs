// Date normalization for upload items.
// Output is always `YYYY-MM-DDTHH:MM:SS[.ffffff]±HH:MM`; naive inputs are UTC.
// Sub-microsecond precision is dropped so that normalizing twice is a no-op.
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

pub(crate) const ACCEPTED_FORMATS: &str =
    "YYYY-MM-DD, an iso-formatted time stamp, or MM/DD/YY HH:mm";

/// Parse `input` and re-emit it in canonical ISO-8601 form.
pub fn normalize_date(input: &str) -> Result<String, String> {
    let parsed = parse_timestamp(input).or_else(|| parse_short_us(input));
    let Some(parsed) = parsed else {
        return Err(format!(
            "could not validate format '{input}'. Must be {ACCEPTED_FORMATS}"
        ));
    };
    format_canonical(parsed).map_err(|err| format!("could not format date '{input}': {err}"))
}

fn parse_timestamp(input: &str) -> Option<OffsetDateTime> {
    let trimmed = input.trim();
    OffsetDateTime::parse(trimmed, &Rfc3339)
        .ok()
        .or_else(|| OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT).ok())
        .or_else(|| parse_naive(trimmed).map(PrimitiveDateTime::assume_utc))
}

fn parse_naive(input: &str) -> Option<PrimitiveDateTime> {
    let with_time = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    with_time
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(input, format).ok())
        .or_else(|| {
            Date::parse(input, format_description!("[year]-[month]-[day]"))
                .ok()
                .map(|date| date.with_time(Time::MIDNIGHT))
        })
}

/// `MM/DD/YY HH:mm`, two-digit years pivot at 69 (69-99 are 19xx).
fn parse_short_us(input: &str) -> Option<OffsetDateTime> {
    let (date, clock) = input.trim().split_once(' ')?;
    let mut date_parts = date.split('/');
    let month = two_digits(date_parts.next()?)?;
    let day = two_digits(date_parts.next()?)?;
    let year = two_digits(date_parts.next()?)?;
    if date_parts.next().is_some() {
        return None;
    }
    let (hour, minute) = clock.split_once(':')?;
    let hour = two_digits(hour)?;
    let minute = two_digits(minute)?;

    let year = if year >= 69 {
        1900 + i32::from(year)
    } else {
        2000 + i32::from(year)
    };
    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

fn two_digits(part: &str) -> Option<u8> {
    if part.len() != 2 || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn format_canonical(value: OffsetDateTime) -> Result<String, time::error::Format> {
    let micros = value.microsecond();
    let value = value
        .replace_microsecond(micros)
        .unwrap_or(value);
    if micros == 0 {
        value.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ))
    } else {
        value.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6][offset_hour sign:mandatory]:[offset_minute]"
        ))
    }
}
