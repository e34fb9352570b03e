pub mod deduction;
pub mod money;
pub mod query;
pub mod schedule_c;
pub mod summary;
pub mod transaction;

pub use deduction::{
    DeductionData, DeductionError, DeductionRates, HomeOfficeDeduction, HomeOfficeMethod,
    MileageDeduction,
};
pub use money::Money;
pub use query::{SortKey, SortOrder, ToggleFilter, TransactionPage, TransactionQuery, TypeFilter};
pub use schedule_c::{ScheduleC, ScheduleCLine, ScheduleCSummary};
pub use summary::{Summary, SummaryReport};
pub use transaction::{Category, RawRow, Transaction, TransactionId, TransactionUpdate};
