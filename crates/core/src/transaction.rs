use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::bank::BankCode;
use super::entity::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(TransactionType::Debit),
            "credit" => Ok(TransactionType::Credit),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

/// Lifecycle of a transaction's reconciliation state. Only ever leaves
/// `Unmatched` once; re-processing must skip anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Unmatched,
    Matched,
    Manual,
    Ignored,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Unmatched => "unmatched",
            MatchStatus::Matched => "matched",
            MatchStatus::Manual => "manual",
            MatchStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unmatched" => Ok(MatchStatus::Unmatched),
            "matched" => Ok(MatchStatus::Matched),
            "manual" => Ok(MatchStatus::Manual),
            "ignored" => Ok(MatchStatus::Ignored),
            other => Err(format!("Unknown match status: '{other}'")),
        }
    }
}

/// Payment rail derived from the description prefix. Absence means the
/// extractor could not classify it, which is not the same as `Other`
/// (a positively-identified miscellaneous rail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Neft,
    Imps,
    InternalTransfer,
    Pos,
    Upi,
    AchDebit,
    Refund,
    Emi,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Neft => "neft",
            PaymentMethod::Imps => "imps",
            PaymentMethod::InternalTransfer => "internal_transfer",
            PaymentMethod::Pos => "pos",
            PaymentMethod::Upi => "upi",
            PaymentMethod::AchDebit => "ach_debit",
            PaymentMethod::Refund => "refund",
            PaymentMethod::Emi => "emi",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neft" => Ok(PaymentMethod::Neft),
            "imps" => Ok(PaymentMethod::Imps),
            "internal_transfer" => Ok(PaymentMethod::InternalTransfer),
            "pos" => Ok(PaymentMethod::Pos),
            "upi" => Ok(PaymentMethod::Upi),
            "ach_debit" => Ok(PaymentMethod::AchDebit),
            "refund" => Ok(PaymentMethod::Refund),
            "emi" => Ok(PaymentMethod::Emi),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("Unknown payment method: '{other}'")),
        }
    }
}

/// Closed purpose vocabulary derived from description keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurposeTag {
    Salary,
    Rent,
    Emi,
    Refund,
    Bills,
    ClientPayment,
    InternalTransfer,
    Subscription,
}

impl PurposeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            PurposeTag::Salary => "salary",
            PurposeTag::Rent => "rent",
            PurposeTag::Emi => "emi",
            PurposeTag::Refund => "refund",
            PurposeTag::Bills => "bills",
            PurposeTag::ClientPayment => "client_payment",
            PurposeTag::InternalTransfer => "internal_transfer",
            PurposeTag::Subscription => "subscription",
        }
    }
}

impl std::str::FromStr for PurposeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salary" => Ok(PurposeTag::Salary),
            "rent" => Ok(PurposeTag::Rent),
            "emi" => Ok(PurposeTag::Emi),
            "refund" => Ok(PurposeTag::Refund),
            "bills" => Ok(PurposeTag::Bills),
            "client_payment" => Ok(PurposeTag::ClientPayment),
            "internal_transfer" => Ok(PurposeTag::InternalTransfer),
            "subscription" => Ok(PurposeTag::Subscription),
            other => Err(format!("Unknown purpose tag: '{other}'")),
        }
    }
}

/// One line item of a statement in the unified shape every bank parser
/// produces. Immutable after parse except for the match-related fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: Option<i64>,
    pub statement_id: Option<i64>,
    pub bank: BankCode,
    pub account_number: String,
    pub date: NaiveDate,
    pub value_date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    pub reference: Option<String>,
    /// Always non-negative; direction lives in `tx_type`.
    pub amount_cents: i64,
    pub tx_type: TransactionType,
    pub balance_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub counterparty: Option<String>,
    pub counterparty_bank: Option<String>,
    pub purpose: Option<PurposeTag>,
    pub match_status: MatchStatus,
    pub matched_entity: Option<EntityKind>,
    pub matched_entity_id: Option<String>,
    pub match_confidence: Option<u8>,
    pub match_reason: Option<String>,
}

impl BankTransaction {
    /// Re-processing must skip transactions that already left `Unmatched`.
    pub fn is_matchable(&self) -> bool {
        self.match_status == MatchStatus::Unmatched
    }

    pub fn is_debit(&self) -> bool {
        self.tx_type == TransactionType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.tx_type == TransactionType::Credit
    }
}
