use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use khata_core::Month;

/// Parse a display amount into cents. Statements render blank cells, dashes
/// and currency symbols freely, so this never fails — anything unparseable
/// is zero.
pub fn parse_amount_cents(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return 0;
    }
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '₹' | '"' | ' '))
        .collect();
    let Ok(dec) = Decimal::from_str(cleaned.trim()) else {
        return 0;
    };
    let dec = if negative { -dec } else { dec };
    (dec * Decimal::from(100)).round().to_i64().unwrap_or(0)
}

/// Spreadsheet serial dates count days since 1899-12-30, the conventional
/// epoch that absorbs the 1900 leap-year bug.
pub fn serial_to_date(serial: i64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial))
}

/// Parse a cell into a date, trying formats in priority order:
/// ISO (with an optional time component, truncated), `DD/MM/YYYY`,
/// `DD/MM/YY` (assumed 20xx), then a 5-digit spreadsheet serial.
/// Anything else falls back to the first day of the statement's label month
/// rather than failing the whole parse.
pub fn parse_date(raw: &str, fallback: Month) -> NaiveDate {
    try_parse_date(raw).unwrap_or_else(|| fallback.first_day())
}

pub fn try_parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // ISO, possibly with a trailing " HH:MM:SS" to drop.
    let iso_part = s.split_whitespace().next().unwrap_or(s);
    if let Ok(date) = NaiveDate::parse_from_str(iso_part, "%Y-%m-%d") {
        return Some(date);
    }

    // DD/MM/YYYY and DD/MM/YY. The year width picks the branch up front:
    // chrono's %Y happily accepts two-digit years, which would put a
    // DD/MM/YY cell in year 00xx. Two-digit years are always 20xx,
    // chrono's 1969 pivot does not apply to bank exports.
    if let [d, m, y] = s.split('/').collect::<Vec<_>>().as_slice() {
        let day = d.parse::<u32>().ok();
        let month = m.parse::<u32>().ok();
        let year = match y.len() {
            4 => y.parse::<i32>().ok(),
            2 => y.parse::<i32>().ok().map(|y| 2000 + y),
            _ => None,
        };
        if let (Some(day), Some(month), Some(year)) = (day, month, year) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    if s.len() == 5 && s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(serial) = s.parse::<i64>() {
            return serial_to_date(serial);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec_2020() -> Month {
        Month::new(2020, 12).unwrap()
    }

    // ── parse_amount_cents ────────────────────────────────────────────────────

    #[test]
    fn amount_with_thousands_separator() {
        assert_eq!(parse_amount_cents("1,234.56"), 123456);
    }

    #[test]
    fn amount_with_currency_symbol() {
        assert_eq!(parse_amount_cents("$3,700"), 370000);
        assert_eq!(parse_amount_cents("₹2,500.00"), 250000);
    }

    #[test]
    fn amount_blank_and_dash_are_zero() {
        assert_eq!(parse_amount_cents(""), 0);
        assert_eq!(parse_amount_cents("-"), 0);
        assert_eq!(parse_amount_cents("   "), 0);
    }

    #[test]
    fn amount_garbage_is_zero() {
        assert_eq!(parse_amount_cents("n/a"), 0);
    }

    #[test]
    fn amount_accounting_parens() {
        assert_eq!(parse_amount_cents("(75.25)"), -7525);
    }

    #[test]
    fn amount_plain_negative() {
        assert_eq!(parse_amount_cents("-50.00"), -5000);
    }

    // ── dates ─────────────────────────────────────────────────────────────────

    #[test]
    fn date_iso() {
        assert_eq!(parse_date("2020-01-12", dec_2020()), date(2020, 1, 12));
    }

    #[test]
    fn date_iso_with_time_truncated() {
        assert_eq!(
            parse_date("2020-01-12 00:00:00", dec_2020()),
            date(2020, 1, 12)
        );
    }

    #[test]
    fn date_dd_mm_yyyy() {
        assert_eq!(parse_date("22/12/2020", dec_2020()), date(2020, 12, 22));
    }

    #[test]
    fn date_two_digit_year_is_20xx() {
        assert_eq!(parse_date("22/12/20", dec_2020()), date(2020, 12, 22));
    }

    #[test]
    fn date_year_width_picks_the_branch() {
        // The same calendar day in both slash widths; the two-digit form
        // must never fall through to a year-00xx parse.
        assert_eq!(parse_date("05/01/21", dec_2020()), date(2021, 1, 5));
        assert_eq!(parse_date("05/01/2021", dec_2020()), date(2021, 1, 5));
        assert!(try_parse_date("05/01/021").is_none());
    }

    #[test]
    fn date_two_digit_year_ignores_chrono_pivot() {
        // chrono's %y would put 99 in 1999; statements mean 2099.
        assert_eq!(parse_date("22/12/99", dec_2020()), date(2099, 12, 22));
    }

    #[test]
    fn date_spreadsheet_serial() {
        // 43831 is 2020-01-01 in the 1899-12-30 epoch.
        assert_eq!(parse_date("43831", dec_2020()), date(2020, 1, 1));
        assert_eq!(serial_to_date(45667), Some(date(2025, 1, 10)));
    }

    #[test]
    fn date_serial_lands_on_leap_day() {
        assert_eq!(parse_date("43890", dec_2020()), date(2020, 2, 29));
    }

    #[test]
    fn date_unparseable_falls_back_to_label_month() {
        assert_eq!(parse_date("??", dec_2020()), date(2020, 12, 1));
        assert_eq!(parse_date("", dec_2020()), date(2020, 12, 1));
    }

    #[test]
    fn try_parse_returns_none_for_garbage() {
        assert!(try_parse_date("12345678").is_none()); // 8 digits, not a serial
        assert!(try_parse_date("yesterday").is_none());
    }
}
