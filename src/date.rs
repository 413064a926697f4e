//! PDF date strings: `D:YYYYMMDDHHmmSSOHH'mm'`.
//!
//! Everything after the year is optional; a missing offset means UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PDF_DATE: Regex = Regex::new(
        r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:([Zz+\-])(?:(\d{2})'?(?:(\d{2})'?)?)?)?"
    )
    .expect("static date pattern");
}

/// Parse a PDF date string into UTC. Returns `None` for unparseable input.
pub fn parse_pdf_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = PDF_DATE.captures(text.trim())?;
    let num = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2, 1)?, num(3, 1)?)?;
    let naive = date.and_hms_opt(num(4, 0)?, num(5, 0)?, num(6, 0)?)?;

    let offset_seconds = match caps.get(7).map(|m| m.as_str()) {
        Some("+") | Some("-") => {
            let seconds = (num(8, 0)? * 3600 + num(9, 0)? * 60) as i32;
            if caps.get(7).map(|m| m.as_str()) == Some("-") {
                -seconds
            } else {
                seconds
            }
        },
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
