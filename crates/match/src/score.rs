use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use khata_core::EntityKind;

/// Maximum points per signal category. Confidence is their sum, 0–100.
pub const IDENTITY_MAX: i64 = 40;
pub const IDENTITY_ALT: i64 = 32;
pub const IDENTITY_PARTIAL_CEILING: i64 = 28;
pub const AMOUNT_MAX: i64 = 30;
pub const AMOUNT_NEAR: i64 = 20;
pub const AMOUNT_LOOSE: i64 = 10;
pub const DATE_MAX: i64 = 20;
pub const DATE_WEEK: i64 = 12;
pub const DATE_FORTNIGHT: i64 = 6;
pub const DATE_SAME_MONTH: i64 = 3;
pub const PATTERN_BONUS: i64 = 10;

/// Amounts within one cent count as exact.
const AMOUNT_TOLERANCE_CENTS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Identity,
    Amount,
    Date,
    Pattern,
    Adjustment,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Identity => "identity",
            SignalKind::Amount => "amount",
            SignalKind::Date => "date",
            SignalKind::Pattern => "pattern",
            SignalKind::Adjustment => "adjustment",
        }
    }
}

/// One scored contribution. Reasons stay structured until rendered at the
/// boundary, so callers can re-rank or display them without string parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub points: i64,
    pub detail: String,
}

impl Signal {
    pub fn new(kind: SignalKind, points: i64, detail: impl Into<String>) -> Self {
        Signal {
            kind,
            points,
            detail: detail.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{}: {} ({:+})", self.kind.as_str(), self.detail, self.points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Pattern,
    Partial,
    MultiFactor,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Pattern => "pattern",
            MatchKind::Partial => "partial",
            MatchKind::MultiFactor => "multi_factor",
        }
    }
}

/// A proposed (or confirmed) linkage between one transaction and one entity.
/// Ephemeral per matching run; persisted only once confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiEntityMatch {
    pub entity: EntityKind,
    /// Empty string means "confirming this creates a new entity".
    pub entity_id: String,
    pub description: String,
    pub confidence: u8,
    pub kind: MatchKind,
    pub signals: Vec<Signal>,
}

impl MultiEntityMatch {
    pub fn from_signals(
        entity: EntityKind,
        entity_id: impl Into<String>,
        description: impl Into<String>,
        signals: Vec<Signal>,
    ) -> Self {
        let confidence = total(&signals);
        MultiEntityMatch {
            entity,
            entity_id: entity_id.into(),
            description: description.into(),
            confidence,
            kind: classify(&signals),
            signals,
        }
    }

    pub fn is_auto_confirmable(&self) -> bool {
        self.confidence >= 80
    }

    pub fn reasons(&self) -> Vec<String> {
        self.signals.iter().map(Signal::render).collect()
    }
}

pub fn total(signals: &[Signal]) -> u8 {
    signals
        .iter()
        .map(|s| s.points)
        .sum::<i64>()
        .clamp(0, 100) as u8
}

/// `Exact` when identity hit its maximum band; `Pattern` when a configured
/// pattern rule contributed; otherwise `Partial` for a single contributing
/// category, `MultiFactor` for several.
pub fn classify(signals: &[Signal]) -> MatchKind {
    if signals
        .iter()
        .any(|s| s.kind == SignalKind::Identity && s.points >= IDENTITY_MAX)
    {
        return MatchKind::Exact;
    }
    if signals
        .iter()
        .any(|s| s.kind == SignalKind::Pattern && s.points > 0)
    {
        return MatchKind::Pattern;
    }
    let contributing: Vec<SignalKind> = signals
        .iter()
        .filter(|s| s.points > 0)
        .map(|s| s.kind)
        .collect();
    if contributing.len() <= 1 {
        MatchKind::Partial
    } else {
        MatchKind::MultiFactor
    }
}

/// Identity signal: exact case-insensitive substring beats a configured
/// alternate pattern, which beats proportional word overlap (capped below
/// the alternate band).
pub fn identity_signal(name: &str, texts: &[&str], alternates: &[String]) -> Option<Signal> {
    let name_lower = name.trim().to_lowercase();
    if name_lower.is_empty() {
        return None;
    }
    let haystack = texts.join(" ").to_lowercase();

    if haystack.contains(&name_lower) {
        return Some(Signal::new(
            SignalKind::Identity,
            IDENTITY_MAX,
            format!("exact name match '{name}'"),
        ));
    }

    for alt in alternates {
        let alt_lower = alt.trim().to_lowercase();
        if !alt_lower.is_empty() && haystack.contains(&alt_lower) {
            return Some(Signal::new(
                SignalKind::Identity,
                IDENTITY_ALT,
                format!("alternate name match '{alt}'"),
            ));
        }
    }

    let words: Vec<&str> = name_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .collect();
    if words.is_empty() {
        return None;
    }
    let found = words.iter().filter(|w| haystack.contains(**w)).count();
    if found == 0 {
        return None;
    }
    let points =
        ((found as f64 / words.len() as f64) * IDENTITY_MAX as f64).round() as i64;
    let points = points.min(IDENTITY_PARTIAL_CEILING);
    Some(Signal::new(
        SignalKind::Identity,
        points,
        format!("partial name match '{name}' ({found}/{} words)", words.len()),
    ))
}

pub fn amount_signal(actual_cents: i64, expected_cents: i64) -> Option<Signal> {
    if expected_cents <= 0 {
        return None;
    }
    let diff = (actual_cents - expected_cents).abs();
    if diff <= AMOUNT_TOLERANCE_CENTS {
        return Some(Signal::new(
            SignalKind::Amount,
            AMOUNT_MAX,
            "exact amount match",
        ));
    }
    let pct = diff as f64 * 100.0 / expected_cents as f64;
    if pct <= 5.0 {
        Some(Signal::new(
            SignalKind::Amount,
            AMOUNT_NEAR,
            format!("amount within 5% ({pct:.1}%)"),
        ))
    } else if pct <= 10.0 {
        Some(Signal::new(
            SignalKind::Amount,
            AMOUNT_LOOSE,
            format!("amount within 10% ({pct:.1}%)"),
        ))
    } else {
        None
    }
}

pub fn date_signal(actual: NaiveDate, expected: NaiveDate) -> Option<Signal> {
    let days = (actual - expected).num_days().abs();
    if days <= 3 {
        Some(Signal::new(
            SignalKind::Date,
            DATE_MAX,
            format!("date within 3 days ({days}d)"),
        ))
    } else if days <= 7 {
        Some(Signal::new(
            SignalKind::Date,
            DATE_WEEK,
            format!("date within 7 days ({days}d)"),
        ))
    } else if days <= 14 {
        Some(Signal::new(
            SignalKind::Date,
            DATE_FORTNIGHT,
            format!("date within 14 days ({days}d)"),
        ))
    } else if khata_core::Month::of(actual) == khata_core::Month::of(expected) {
        Some(Signal::new(
            SignalKind::Date,
            DATE_SAME_MONTH,
            "same calendar month",
        ))
    } else {
        None
    }
}

/// A configured per-entity regex hit earns a flat bonus on top of identity.
pub fn pattern_signal(pattern: &str, text: &str) -> Option<Signal> {
    let re = regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()?;
    re.is_match(text).then(|| {
        Signal::new(
            SignalKind::Pattern,
            PATTERN_BONUS,
            format!("pattern rule '{pattern}' matched"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn identity_exact_scores_max() {
        let s = identity_signal("NETFLIX", &["ACH D- NETFLIX ENTERTAINMENT"], &[]).unwrap();
        assert_eq!(s.points, IDENTITY_MAX);
    }

    #[test]
    fn identity_alternate_scores_below_exact() {
        let s = identity_signal(
            "AWS",
            &["POS 4160 AMAZON WEB SERVICES"],
            &["AMAZON WEB SERVICES".to_string()],
        )
        .unwrap();
        assert_eq!(s.points, IDENTITY_ALT);
    }

    #[test]
    fn identity_partial_is_capped_below_alternate() {
        // 2 of 3 words found: raw 27 points, under the cap.
        let s = identity_signal(
            "ACME CORP INTERNATIONAL",
            &["NEFT DR-SBIN0-ACME CORP LTD"],
            &[],
        )
        .unwrap();
        assert!(s.points > 0);
        assert!(s.points <= IDENTITY_PARTIAL_CEILING);
        assert!(s.points < IDENTITY_ALT);
    }

    #[test]
    fn identity_all_words_found_without_substring_hits_cap() {
        // Words appear out of order: full overlap but not a substring match.
        let s = identity_signal("CORP ACME", &["ACME SOMETHING CORP"], &[]).unwrap();
        assert_eq!(s.points, IDENTITY_PARTIAL_CEILING);
    }

    #[test]
    fn identity_absent_is_none() {
        assert!(identity_signal("NETFLIX", &["POS GROCERY STORE"], &[]).is_none());
        assert!(identity_signal("", &["anything"], &[]).is_none());
    }

    #[test]
    fn amount_bands() {
        assert_eq!(amount_signal(100_000, 100_000).unwrap().points, AMOUNT_MAX);
        assert_eq!(amount_signal(100_001, 100_000).unwrap().points, AMOUNT_MAX);
        assert_eq!(amount_signal(104_000, 100_000).unwrap().points, AMOUNT_NEAR);
        assert_eq!(amount_signal(109_000, 100_000).unwrap().points, AMOUNT_LOOSE);
        assert!(amount_signal(150_000, 100_000).is_none());
        assert!(amount_signal(100, 0).is_none());
    }

    #[test]
    fn date_bands() {
        let base = date(2020, 12, 15);
        assert_eq!(date_signal(date(2020, 12, 17), base).unwrap().points, DATE_MAX);
        assert_eq!(date_signal(date(2020, 12, 21), base).unwrap().points, DATE_WEEK);
        assert_eq!(
            date_signal(date(2020, 12, 28), base).unwrap().points,
            DATE_FORTNIGHT
        );
        assert_eq!(
            date_signal(date(2020, 12, 31), base).unwrap().points,
            DATE_SAME_MONTH
        );
        assert!(date_signal(date(2021, 1, 16), base).is_none());
    }

    #[test]
    fn pattern_is_case_insensitive_and_safe_on_bad_regex() {
        assert!(pattern_signal(r"netflix|nflx", "ACH D- NFLX 443").is_some());
        assert!(pattern_signal(r"((broken", "anything").is_none());
    }

    #[test]
    fn classify_bands() {
        let exact = vec![Signal::new(SignalKind::Identity, IDENTITY_MAX, "x")];
        assert_eq!(classify(&exact), MatchKind::Exact);

        let pattern = vec![
            Signal::new(SignalKind::Identity, 28, "x"),
            Signal::new(SignalKind::Pattern, PATTERN_BONUS, "y"),
        ];
        assert_eq!(classify(&pattern), MatchKind::Pattern);

        let partial = vec![Signal::new(SignalKind::Amount, AMOUNT_MAX, "x")];
        assert_eq!(classify(&partial), MatchKind::Partial);

        let multi = vec![
            Signal::new(SignalKind::Amount, AMOUNT_MAX, "x"),
            Signal::new(SignalKind::Date, DATE_MAX, "y"),
        ];
        assert_eq!(classify(&multi), MatchKind::MultiFactor);
    }

    #[test]
    fn total_clamps_to_valid_range() {
        let over = vec![
            Signal::new(SignalKind::Identity, 40, "a"),
            Signal::new(SignalKind::Amount, 30, "b"),
            Signal::new(SignalKind::Date, 20, "c"),
            Signal::new(SignalKind::Pattern, 10, "d"),
            Signal::new(SignalKind::Pattern, 10, "e"),
        ];
        assert_eq!(total(&over), 100);
        let negative = vec![Signal::new(SignalKind::Adjustment, -25, "penalty")];
        assert_eq!(total(&negative), 0);
    }

    #[test]
    fn reasons_render_human_readable() {
        let m = MultiEntityMatch::from_signals(
            EntityKind::Subscription,
            "7",
            "Netflix Premium",
            vec![Signal::new(SignalKind::Identity, 40, "exact name match 'NETFLIX'")],
        );
        assert_eq!(m.reasons(), vec!["identity: exact name match 'NETFLIX' (+40)"]);
        assert_eq!(m.confidence, 40);
    }
}
