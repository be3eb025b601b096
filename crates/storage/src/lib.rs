//! SQLite persistence: schema, statement/transaction/entity queries,
//! import dedup, and the guarded confirmation actions.

pub mod confirm;
pub mod db;
pub mod queries;

pub use confirm::{
    bulk_confirm, confirm, confirm_expense, confirm_new_expense, confirm_order, confirm_salary,
    confirm_subscription, confirm_transfer, reject, BulkOutcome, ConfirmError, ConfirmMode,
    ConfirmRequest,
};
pub use db::{create_db, create_memory_db, DbPool};
pub use queries::{
    file_checksum, find_import_by_checksum, get_active_subscriptions, get_own_accounts,
    get_pending_expenses, get_salaries_for_month, get_statement, get_transaction,
    get_transactions_for_statement, get_unmatched_transactions, get_unsettled_orders,
    insert_expense, insert_order_payment, insert_salary, insert_statement, insert_subscription,
    insert_transaction, record_import,
};
