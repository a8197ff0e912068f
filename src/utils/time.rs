use chrono::{
    Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use now::DateTimeNow;

use crate::error::{Result, TrckrError};

use super::clock::Clock;

/// Formats accepted for a single point in time, tried in this order.
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
const DAY_FORMAT: &str = "%m/%d";

/// Latest second of a day for `today` and `week`. `month` deliberately stops at 23:00:00.
const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(v) => v,
    None => panic!("23:59:59 is a valid time"),
};
const END_OF_MONTH: NaiveTime = match NaiveTime::from_hms_opt(23, 0, 0) {
    Some(v) => v,
    None => panic!("23:00:00 is a valid time"),
};

/// Converts a time token into a timestamp. Missing tokens, `now` and `-` mean the current time.
/// `HH:MM` and `HH:MM:SS` are today at that time, `MM/DD` is midnight of that day this year.
pub fn parse_time(token: Option<&str>, clock: &dyn Clock) -> Result<NaiveDateTime> {
    let now = clock.time();
    let token = match token.map(str::trim) {
        None | Some("") | Some("now") | Some("-") => return Ok(now),
        Some(token) => token,
    };

    for format in TIME_FORMATS {
        // chrono accepts `:60` as a leap second, which isn't a time anyone tracks.
        if let Ok(time) = NaiveTime::parse_from_str(token, format) {
            if time.nanosecond() != 0 {
                return Err(TrckrError::parse(token, "time"));
            }
            return Ok(now.date().and_time(time));
        }
    }

    // A year is needed for chrono to build a date, so the current one is glued on.
    let with_year = format!("{}/{token}", now.year());
    if let Ok(date) = NaiveDate::parse_from_str(&with_year, &format!("%Y/{DAY_FORMAT}")) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(TrckrError::parse(token, "time"))
}

/// Converts an interval token into a pair of optional bounds. `None` means unbounded.
pub fn parse_interval(
    token: Option<&str>,
    clock: &dyn Clock,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    let Some(token) = token.map(str::trim) else {
        return Ok((None, None));
    };

    // now works with time zones, so naive local time is treated as if it were UTC.
    let now = Utc.from_utc_datetime(&clock.time());

    match token {
        "-" => Ok((None, None)),
        "today" | "day" => {
            let start = now.beginning_of_day().naive_utc();
            Ok((Some(start), Some(start.date().and_time(END_OF_DAY))))
        }
        "week" => {
            let monday = now.date_naive()
                - Days::new(now.weekday().num_days_from_monday() as u64);
            let sunday = monday + Days::new(6);
            Ok((
                Some(monday.and_time(NaiveTime::MIN)),
                Some(sunday.and_time(END_OF_DAY)),
            ))
        }
        "month" => {
            let first = now.beginning_of_month().date_naive();
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|v| v.pred_opt())
                .ok_or_else(|| TrckrError::parse(token, "interval"))?;
            Ok((
                Some(first.and_time(NaiveTime::MIN)),
                Some(last.and_time(END_OF_MONTH)),
            ))
        }
        _ => match token.split('-').collect::<Vec<_>>().as_slice() {
            [from, to] => Ok((
                Some(parse_time(Some(from), clock)?),
                Some(parse_time(Some(to), clock)?),
            )),
            _ => Err(TrckrError::parse(token, "interval")),
        },
    }
}
