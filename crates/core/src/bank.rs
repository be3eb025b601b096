use serde::{Deserialize, Serialize};
use std::fmt;

/// Banks with a known statement layout. `Other` means the format detector
/// found no fingerprint and the file must be rejected, never guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BankCode {
    Hdfc,
    Icici,
    Other,
}

impl BankCode {
    pub fn as_str(self) -> &'static str {
        match self {
            BankCode::Hdfc => "HDFC",
            BankCode::Icici => "ICICI",
            BankCode::Other => "OTHER",
        }
    }

    pub fn is_supported(self) -> bool {
        self != BankCode::Other
    }
}

impl fmt::Display for BankCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BankCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HDFC" => Ok(BankCode::Hdfc),
            "ICICI" => Ok(BankCode::Icici),
            "OTHER" => Ok(BankCode::Other),
            other => Err(format!("Unknown bank code: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        for code in [BankCode::Hdfc, BankCode::Icici, BankCode::Other] {
            assert_eq!(code.as_str().parse::<BankCode>().unwrap(), code);
        }
    }

    #[test]
    fn other_is_not_supported() {
        assert!(BankCode::Hdfc.is_supported());
        assert!(!BankCode::Other.is_supported());
    }
}
