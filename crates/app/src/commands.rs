use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schedc_categorize::{CategorizeError, Categorizer, ClassifierBackend, ClassifyError};
use schedc_core::{
    DeductionData, DeductionError, DeductionRates, HomeOfficeDeduction, HomeOfficeMethod,
    MileageDeduction, ScheduleC, Summary, SummaryReport, ToggleFilter, Transaction,
    TransactionId, TransactionPage, TransactionQuery, TransactionUpdate,
};
use schedc_import::CsvError;
use schedc_storage::{StoreError, TransactionStore};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct CommandError {
    pub message: String,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        CommandError { message: e.to_string() }
    }
}

impl From<CsvError> for CommandError {
    fn from(e: CsvError) -> Self {
        CommandError { message: e.to_string() }
    }
}

impl From<DeductionError> for CommandError {
    fn from(e: DeductionError) -> Self {
        CommandError { message: e.to_string() }
    }
}

impl From<CategorizeError> for CommandError {
    fn from(e: CategorizeError) -> Self {
        CommandError { message: e.to_string() }
    }
}

impl From<ClassifyError> for CommandError {
    fn from(e: ClassifyError) -> Self {
        CommandError { message: e.to_string() }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError { message: e.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub transactions_added: usize,
    pub total_rows: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileUploadResult {
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchUploadOutcome {
    pub results: Vec<FileUploadResult>,
    pub total_uploaded: usize,
    pub total_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleOutcome {
    pub success: bool,
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizeOutcome {
    pub success: bool,
    pub processed: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Command surface over one store. Owns the deduction rates and hands out
/// strictly increasing ingestion timestamps so ids stay unique across
/// uploads that land in the same millisecond.
pub struct Ledger {
    store: TransactionStore,
    rates: DeductionRates,
    last_ingest_ms: std::sync::Mutex<i64>,
}

impl Ledger {
    pub fn new(store: TransactionStore, rates: DeductionRates) -> Self {
        Self {
            store,
            rates,
            last_ingest_ms: std::sync::Mutex::new(0),
        }
    }

    pub async fn open(path: &Path, rates: DeductionRates) -> Result<Self, CommandError> {
        Ok(Self::new(TransactionStore::open(path).await?, rates))
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    fn next_ingest_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self
            .last_ingest_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let ms = now.timestamp_millis().max(*last + 1);
        *last = ms;
        DateTime::from_timestamp_millis(ms).unwrap_or(now)
    }

    pub async fn upload_csv<R: Read>(
        &self,
        data: R,
        file_name: &str,
        source: &str,
    ) -> Result<UploadOutcome, CommandError> {
        let parsed = schedc_import::parse_file(data, source, self.next_ingest_time()).map_err(
            |e| CommandError {
                message: format!("Failed to process {file_name}: {e}"),
            },
        )?;

        self.store.append(&parsed.transactions).await?;
        tracing::info!(
            file = file_name,
            source,
            added = parsed.parsed,
            total = parsed.total,
            "Imported CSV"
        );

        Ok(UploadOutcome {
            success: true,
            transactions_added: parsed.parsed,
            total_rows: parsed.total,
            message: format!(
                "Successfully processed {} transactions from {}",
                parsed.parsed, file_name
            ),
        })
    }

    /// Files are processed in order. A failing file is reported and the
    /// rest of the batch still runs.
    pub async fn upload_files(&self, paths: &[PathBuf], source: &str) -> BatchUploadOutcome {
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let outcome = match tokio::fs::read(path).await {
                Ok(bytes) => self.upload_csv(bytes.as_slice(), &file, source).await,
                Err(e) => Err(CommandError::from(e)),
            };

            match outcome {
                Ok(result) => results.push(FileUploadResult {
                    file,
                    success: true,
                    result: Some(result),
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Upload failed");
                    results.push(FileUploadResult {
                        file,
                        success: false,
                        result: None,
                        error: Some(e.message),
                    });
                }
            }
        }

        let total_uploaded = results.iter().filter(|r| r.success).count();
        BatchUploadOutcome {
            total_failed: results.len() - total_uploaded,
            total_uploaded,
            results,
        }
    }

    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, CommandError> {
        let all = self.store.get_all().await?;
        Ok(query.run(&all))
    }

    pub async fn toggle_business(
        &self,
        id: &TransactionId,
        is_business: bool,
    ) -> Result<ToggleOutcome, CommandError> {
        let found = self
            .store
            .update_one(id, &TransactionUpdate::business(is_business))
            .await?;
        Ok(ToggleOutcome {
            success: true,
            updated: usize::from(found),
        })
    }

    pub async fn toggle_all_business(
        &self,
        is_business: bool,
        filter: &ToggleFilter,
    ) -> Result<ToggleOutcome, CommandError> {
        let targets: Vec<TransactionId> = self
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|t| filter.matches(t))
            .map(|t| t.id)
            .collect();

        let update = TransactionUpdate::business(is_business);
        let mut updated = 0;
        for id in &targets {
            if self.store.update_one(id, &update).await? {
                updated += 1;
            }
        }

        tracing::info!(updated, is_business, "Bulk business toggle");
        Ok(ToggleOutcome {
            success: true,
            updated,
        })
    }

    pub async fn save_mileage(&self, business_miles: Decimal) -> Result<MileageDeduction, CommandError> {
        let mileage = MileageDeduction {
            business_miles,
            deduction_amount: self.rates.mileage(business_miles)?,
        };
        let saved = mileage.clone();
        self.store
            .update_deductions(move |d| d.mileage = Some(saved))
            .await?;
        Ok(mileage)
    }

    pub async fn save_home_office(
        &self,
        square_feet: Decimal,
        method: HomeOfficeMethod,
        actual_amount: Option<Decimal>,
    ) -> Result<HomeOfficeDeduction, CommandError> {
        let home_office = HomeOfficeDeduction {
            square_feet,
            method,
            deduction_amount: self.rates.home_office(square_feet, method, actual_amount)?,
        };
        let saved = home_office.clone();
        self.store
            .update_deductions(move |d| d.home_office = Some(saved))
            .await?;
        Ok(home_office)
    }

    pub async fn deductions(&self) -> Result<DeductionData, CommandError> {
        Ok(self.store.get_deductions().await?)
    }

    pub async fn summary(&self) -> Result<SummaryReport, CommandError> {
        let transactions = self.store.get_all().await?;
        let deductions = self.store.get_deductions().await?;
        Ok(Summary::compute(&transactions, &deductions).into())
    }

    /// Never fails; a storage error is logged and reads as "no data".
    pub async fn has_transactions(&self) -> bool {
        match self.store.get_all().await {
            Ok(all) => !all.is_empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read transactions");
                false
            }
        }
    }

    pub async fn schedule_c(&self, tax_year: i32) -> Result<ScheduleC, CommandError> {
        let transactions = self.store.get_all().await?;
        let deductions = self.store.get_deductions().await?;
        Ok(ScheduleC::generate(tax_year, &transactions, &deductions))
    }

    pub async fn export_csv(&self) -> Result<String, CommandError> {
        let transactions = self.store.get_all().await?;
        let deductions = self.store.get_deductions().await?;
        let mut buf = Vec::new();
        schedc_import::export_csv(&mut buf, &transactions, &deductions)?;
        String::from_utf8(buf).map_err(|e| CommandError { message: e.to_string() })
    }

    /// Classifies business rows that have no real category yet. Each row
    /// gets only the fields its own classification returned, merged into
    /// the stored record.
    pub async fn categorize_uncategorized<B: ClassifierBackend>(
        &self,
        categorizer: &Categorizer<B>,
        credential: &str,
    ) -> Result<CategorizeOutcome, CommandError> {
        if credential.trim().is_empty() {
            return Err(CategorizeError::MissingCredential.into());
        }

        let targets: Vec<Transaction> = self
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|t| t.is_business && t.is_uncategorized())
            .collect();

        if targets.is_empty() {
            return Ok(CategorizeOutcome {
                success: true,
                processed: 0,
                total: 0,
                message: Some("No uncategorized business transactions found".to_string()),
            });
        }

        let outcomes = categorizer.classify_all(&targets, credential).await?;

        let mut processed = 0;
        for (tx, outcome) in targets.iter().zip(&outcomes) {
            let Some(classification) = outcome.classification() else {
                continue;
            };
            let update = TransactionUpdate::from(classification);
            if update.is_empty() {
                continue;
            }
            self.store.update_one(&tx.id, &update).await?;

            let mut merged = tx.clone();
            merged.apply(&update);
            if !merged.is_uncategorized() {
                processed += 1;
            }
        }

        Ok(CategorizeOutcome {
            success: true,
            processed,
            total: targets.len(),
            message: None,
        })
    }

    pub async fn clear_transactions(&self) -> Result<(), CommandError> {
        self.store.delete_all().await?;
        tracing::info!("Cleared transactions");
        Ok(())
    }

    /// Clears transactions and resets both deductions.
    pub async fn clear_all(&self) -> Result<(), CommandError> {
        self.store.delete_all().await?;
        self.store.save_deductions(&DeductionData::default()).await?;
        tracing::info!("Cleared all data");
        Ok(())
    }
}
