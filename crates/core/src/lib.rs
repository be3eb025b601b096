pub mod bank;
pub mod entity;
pub mod money;
pub mod period;
pub mod statement;
pub mod transaction;

pub use bank::BankCode;
pub use entity::{
    EntityKind, Expense, OrderPayment, PaymentStatus, Salary, Subscription, SubscriptionCadence,
};
pub use money::Money;
pub use period::{DateRange, Month};
pub use statement::BankStatement;
pub use transaction::{BankTransaction, MatchStatus, PaymentMethod, PurposeTag, TransactionType};
