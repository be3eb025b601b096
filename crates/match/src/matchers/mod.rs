//! One best-candidate strategy per entity kind. Each matcher scans its own
//! pool, scores every candidate, and returns the single highest-scoring
//! match above its acceptance floor, or nothing.

mod expense;
mod order;
mod salary;
mod subscription;
mod transfer;

pub use expense::match_expense;
pub use order::match_order;
pub use salary::match_salary;
pub use subscription::match_subscription;
pub use transfer::match_transfer;

/// Generic confidence bands shared by the salary, subscription, and
/// expense matchers.
pub const THRESHOLD_LOW: u8 = 40;
pub const THRESHOLD_MEDIUM: u8 = 60;
pub const THRESHOLD_HIGH: u8 = 80;

/// Transfer and order detection rest on fewer independent signals, so
/// they only accept at the medium band and above.
pub const TRANSFER_FLOOR: u8 = 60;
pub const ORDER_FLOOR: u8 = 60;

/// Penalty applied to a salary already marked paid; keeps it visible as a
/// low-confidence duplicate-payment warning instead of hiding it.
pub const ALREADY_PAID_PENALTY: i64 = -25;
