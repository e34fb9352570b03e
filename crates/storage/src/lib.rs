pub mod db;
pub mod store;

pub use db::{create_db, get_record, put_record, DbPool, StoreError};
pub use store::{TransactionStore, DEDUCTIONS_KEY, TRANSACTIONS_KEY};
