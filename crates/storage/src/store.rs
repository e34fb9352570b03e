use schedc_core::{DeductionData, Transaction, TransactionId, TransactionUpdate};
use std::path::Path;
use tokio::sync::Mutex;

use crate::db::{self, DbPool, StoreError};

pub const TRANSACTIONS_KEY: &str = "transactions";
pub const DEDUCTIONS_KEY: &str = "deductions";

/// Durable home of the transaction list and the deduction record.
///
/// Every read-modify-write sequence holds `write_lock` for its whole
/// duration, so at most one writer is in flight at a time.
pub struct TransactionStore {
    pool: DbPool,
    write_lock: Mutex<()>,
}

impl TransactionStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(db::create_db(path).await?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// All transactions in insertion order.
    pub async fn get_all(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(db::get_record(&self.pool, TRANSACTIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_all(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_all(transactions).await
    }

    pub async fn append(&self, batch: &[Transaction]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.get_all().await?;
        all.extend_from_slice(batch);
        self.write_all(&all).await?;
        tracing::debug!(added = batch.len(), total = all.len(), "Appended transactions");
        Ok(())
    }

    /// Merges `update` into the matching record. Returns whether a record
    /// was found; an unknown id is not an error.
    pub async fn update_one(
        &self,
        id: &TransactionId,
        update: &TransactionUpdate,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.get_all().await?;
        match all.iter_mut().find(|t| &t.id == id) {
            Some(tx) => {
                tx.apply(update);
                self.write_all(&all).await?;
                Ok(true)
            }
            None => {
                tracing::debug!(%id, "Update for unknown transaction ignored");
                Ok(false)
            }
        }
    }

    pub async fn delete_all(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_all(&[]).await
    }

    pub async fn get_deductions(&self) -> Result<DeductionData, StoreError> {
        Ok(db::get_record(&self.pool, DEDUCTIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_deductions(&self, deductions: &DeductionData) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        db::put_record(&self.pool, DEDUCTIONS_KEY, deductions).await
    }

    /// Read-modify-write of the deduction record under the writer lock.
    pub async fn update_deductions<F>(&self, f: F) -> Result<DeductionData, StoreError>
    where
        F: FnOnce(&mut DeductionData),
    {
        let _guard = self.write_lock.lock().await;
        let mut deductions = self.get_deductions().await?;
        f(&mut deductions);
        db::put_record(&self.pool, DEDUCTIONS_KEY, &deductions).await?;
        Ok(deductions)
    }

    async fn write_all(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        db::put_record(&self.pool, TRANSACTIONS_KEY, transactions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use schedc_core::{HomeOfficeDeduction, HomeOfficeMethod, MileageDeduction, Money, RawRow};
    use std::sync::Arc;

    fn tx(id: &str, vendor: &str, cents: i64) -> Transaction {
        let mut raw = RawRow::new();
        raw.insert("Description".to_string(), vendor.to_string());
        Transaction {
            id: TransactionId::from(id),
            vendor: vendor.to_string(),
            date: "01/15/2024".to_string(),
            amount: Money::from_cents(cents),
            is_business: false,
            category: None,
            purpose: None,
            source: "chase".to_string(),
            raw_data: raw,
        }
    }

    async fn store() -> (tempfile::TempDir, TransactionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TransactionStore::open(&dir.path().join("ledger.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn empty_store_reads_empty() {
        let (_dir, store) = store().await;
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.get_deductions().await.unwrap(), DeductionData::default());
    }

    #[tokio::test]
    async fn save_all_round_trips_in_order() {
        let (_dir, store) = store().await;
        let txs = vec![tx("b", "ZOOM", 1599), tx("a", "STAPLES", 4999), tx("c", "UBER", 2210)];
        store.save_all(&txs).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), txs);
    }

    #[tokio::test]
    async fn append_concatenates_batches() {
        let (_dir, store) = store().await;
        let batch1 = vec![tx("1", "A", 100), tx("2", "B", 200)];
        let batch2 = vec![tx("3", "C", 300)];
        store.append(&batch1).await.unwrap();
        store.append(&batch2).await.unwrap();

        let expected: Vec<Transaction> = batch1.into_iter().chain(batch2).collect();
        assert_eq!(store.get_all().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn update_one_touches_only_the_target_field() {
        let (_dir, store) = store().await;
        let txs = vec![tx("1", "A", 100), tx("2", "B", 200), tx("3", "C", 300)];
        store.save_all(&txs).await.unwrap();

        let found = store
            .update_one(&TransactionId::from("2"), &TransactionUpdate::business(true))
            .await
            .unwrap();
        assert!(found);

        let after = store.get_all().await.unwrap();
        let mut expected = txs.clone();
        expected[1].is_business = true;
        assert_eq!(after, expected);
    }

    #[tokio::test]
    async fn update_unknown_id_is_a_no_op() {
        let (_dir, store) = store().await;
        let txs = vec![tx("1", "A", 100)];
        store.save_all(&txs).await.unwrap();
        let found = store
            .update_one(&TransactionId::from("missing"), &TransactionUpdate::business(true))
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(store.get_all().await.unwrap(), txs);
    }

    #[tokio::test]
    async fn delete_all_empties_transactions_only() {
        let (_dir, store) = store().await;
        store.append(&[tx("1", "A", 100)]).await.unwrap();
        let deductions = DeductionData {
            mileage: Some(MileageDeduction {
                business_miles: Decimal::from(10),
                deduction_amount: Money::from_cents(670),
            }),
            home_office: None,
        };
        store.save_deductions(&deductions).await.unwrap();

        store.delete_all().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.get_deductions().await.unwrap(), deductions);
    }

    #[tokio::test]
    async fn update_deductions_preserves_other_entry() {
        let (_dir, store) = store().await;
        store
            .update_deductions(|d| {
                d.mileage = Some(MileageDeduction {
                    business_miles: Decimal::from(1000),
                    deduction_amount: Money::from_cents(67_000),
                })
            })
            .await
            .unwrap();
        let after = store
            .update_deductions(|d| {
                d.home_office = Some(HomeOfficeDeduction {
                    square_feet: Decimal::from(200),
                    method: HomeOfficeMethod::Simplified,
                    deduction_amount: Money::from_cents(100_000),
                })
            })
            .await
            .unwrap();
        assert!(after.mileage.is_some());
        assert_eq!(store.get_deductions().await.unwrap(), after);
    }

    #[tokio::test]
    async fn concurrent_appends_are_serialized() {
        let (_dir, store) = store().await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(&[tx(&i.to_string(), "X", 100)]).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get_all().await.unwrap().len(), 8);
    }
}
