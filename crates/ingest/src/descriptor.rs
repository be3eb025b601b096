use khata_core::{BankCode, PaymentMethod, PurposeTag};

/// The three optional attributes the extractor can pull out of a free-text
/// description. Anything it cannot derive confidently stays `None` —
/// downstream matchers treat absence as no signal, never a negative one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub payment_method: Option<PaymentMethod>,
    pub counterparty: Option<String>,
    pub counterparty_bank: Option<String>,
    pub purpose: Option<PurposeTag>,
}

pub fn extract(bank: BankCode, description: &str) -> Descriptor {
    let (method, counterparty, counterparty_bank) = match bank {
        BankCode::Hdfc => dissect_hdfc(description),
        BankCode::Icici => dissect_icici(description),
        BankCode::Other => (None, None, None),
    };
    Descriptor {
        payment_method: method,
        counterparty,
        counterparty_bank,
        purpose: purpose_of(description),
    }
}

/// Description prefixes per bank notation, checked in order.
const HDFC_PREFIXES: &[(&str, PaymentMethod)] = &[
    ("NEFT", PaymentMethod::Neft),
    ("RTGS", PaymentMethod::Neft),
    ("IMPS", PaymentMethod::Imps),
    ("FT -", PaymentMethod::InternalTransfer),
    ("FT-", PaymentMethod::InternalTransfer),
    ("POS ", PaymentMethod::Pos),
    ("UPI-", PaymentMethod::Upi),
    ("ACH D-", PaymentMethod::AchDebit),
    ("REV-", PaymentMethod::Refund),
    ("EMI", PaymentMethod::Emi),
];

const ICICI_PREFIXES: &[(&str, PaymentMethod)] = &[
    ("NEFT/", PaymentMethod::Neft),
    ("RTGS/", PaymentMethod::Neft),
    ("MMT/IMPS", PaymentMethod::Imps),
    ("INF/", PaymentMethod::InternalTransfer),
    ("VIN/", PaymentMethod::Pos),
    ("POS/", PaymentMethod::Pos),
    ("UPI/", PaymentMethod::Upi),
    ("ACH/", PaymentMethod::AchDebit),
    ("REV/", PaymentMethod::Refund),
    ("EMI/", PaymentMethod::Emi),
];

fn method_from_prefix(
    table: &[(&str, PaymentMethod)],
    description: &str,
) -> Option<PaymentMethod> {
    let upper = description.trim().to_uppercase();
    table
        .iter()
        .find(|(prefix, _)| upper.starts_with(prefix))
        .map(|(_, method)| *method)
}

/// HDFC narrations are dash-delimited:
///   `NEFT DR-<ifsc>-<name>-<channel>-<ref>`
///   `IMPS-<ref>-<name>-<bank>-<tail>`
///   `UPI-<name>-<vpa>-<ref>`
///   `ACH D- <name>-<ref>`
///   `POS <card mask> <merchant>`
fn dissect_hdfc(description: &str) -> (Option<PaymentMethod>, Option<String>, Option<String>) {
    let method = method_from_prefix(HDFC_PREFIXES, description);
    let parts: Vec<&str> = description.split('-').map(str::trim).collect();

    let (name, bank_code) = match method {
        Some(PaymentMethod::Neft) => (part(&parts, 2), part(&parts, 1)),
        Some(PaymentMethod::Imps) => (part(&parts, 2), part(&parts, 3)),
        Some(PaymentMethod::Upi) => (part(&parts, 1), None),
        Some(PaymentMethod::AchDebit) => (part(&parts, 1), None),
        Some(PaymentMethod::Pos) => (pos_merchant(description), None),
        _ => (None, None),
    };
    (method, name, bank_code)
}

/// ICICI remarks are slash-delimited:
///   `NEFT/<ifsc>/<name>/<purpose>`
///   `MMT/IMPS/<ref>/<purpose>/<name>/<bank>`
///   `UPI/<ref>/<purpose>/<vpa>/<name>`
///   `VIN/<merchant>/<date>/<ref>`
///   `ACH/<name>/<ref>`
fn dissect_icici(description: &str) -> (Option<PaymentMethod>, Option<String>, Option<String>) {
    let method = method_from_prefix(ICICI_PREFIXES, description);
    let parts: Vec<&str> = description.split('/').map(str::trim).collect();

    let (name, bank_code) = match method {
        Some(PaymentMethod::Neft) => (part(&parts, 2), part(&parts, 1)),
        Some(PaymentMethod::Imps) => (part(&parts, 4), part(&parts, 5)),
        Some(PaymentMethod::Upi) => (part(&parts, 4), None),
        Some(PaymentMethod::Pos) => (part(&parts, 1), None),
        Some(PaymentMethod::AchDebit) => (part(&parts, 1), None),
        _ => (None, None),
    };
    (method, name, bank_code)
}

fn part(parts: &[&str], idx: usize) -> Option<String> {
    parts
        .get(idx)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

/// `POS 416021XXXXXX1234 AMAZON IN` — merchant is everything after the
/// card mask token.
fn pos_merchant(description: &str) -> Option<String> {
    let merchant = description
        .split_whitespace()
        .skip(2)
        .collect::<Vec<_>>()
        .join(" ");
    (!merchant.is_empty()).then_some(merchant)
}

/// Keyword table in fixed priority order; the first hit wins so specific
/// purposes (salary) beat generic ones (bills).
const PURPOSE_KEYWORDS: &[(PurposeTag, &[&str])] = &[
    (PurposeTag::Salary, &["salary", "sal credit", "payroll"]),
    (PurposeTag::Rent, &["rent"]),
    (PurposeTag::Emi, &[" emi", "emi ", "emi/", "equated", "loan instal"]),
    (PurposeTag::Refund, &["refund", "reversal", "rev-", "rev/"]),
    (
        PurposeTag::Subscription,
        &["subscription", "netflix", "spotify", "aws", "amazon web services", "github", "adobe", "dropbox", "zoom"],
    ),
    (
        PurposeTag::Bills,
        &["electricity", "utility", "broadband", "bill"],
    ),
    (
        PurposeTag::ClientPayment,
        &["invoice", "inv-", "client", "order payment"],
    ),
    (
        PurposeTag::InternalTransfer,
        &["own account", "self transfer", "ft -", "ft-", "inf/"],
    ),
];

pub fn purpose_of(description: &str) -> Option<PurposeTag> {
    let lower = description.to_lowercase();
    PURPOSE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(tag, _)| *tag)
}
