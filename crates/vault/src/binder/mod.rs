//! Binding between a form's plain values and the remote encrypted records.
//!
//! Two explicit phases, no background re-triggering:
//!
//! - **load** (form open): decrypt each stored record independently. A record
//!   that fails to decrypt is left out of the values, listed in
//!   [`LoadOutcome::failed`] and sent to the [`ErrorReporter`]; the rest of the
//!   form still loads.
//! - **save** (form submit): skip blank fields, encrypt the rest and persist
//!   them one `set` call per field, stopping at the first failure.

pub mod error;
pub mod report;

pub use error::{SubmitCause, SubmitError};
pub use report::{ErrorReporter, TracingReporter};

use std::collections::HashMap;
use std::sync::Arc;

use formvault_common::{FieldRecord, RecordId, RecordStoreError};
use serde_json::{Map, Value};
use tokio::task::{self, JoinSet};
use tracing::{debug, warn};

use crate::crypto::{CipherService, CryptoError};
use crate::dek::DeviceKey;
use crate::records::RecordStore;

/// Decrypted values of one form load, keyed by field name.
pub type DecryptedFieldMap = HashMap<String, Value>;

/// A field dropped from a load because it failed to decrypt.
#[derive(Debug)]
pub struct FieldFailure {
    /// Field name of the dropped record.
    pub field: String,
    /// Why decryption failed.
    pub error: CryptoError,
}

/// Result of [`FormFieldBinder::load_fields`].
///
/// Both lists empty means there was nothing to load; an empty `values` with a
/// non-empty `failed` means every stored field was unreadable.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully decrypted fields.
    pub values: DecryptedFieldMap,
    /// Fields that failed to decrypt, sorted by field name.
    pub failed: Vec<FieldFailure>,
}

impl LoadOutcome {
    /// Returns `true` if no record was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.failed.is_empty()
    }

    /// Names of the fields that failed to decrypt.
    pub fn failed_fields(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|f| f.field.as_str())
    }

    /// Discard failure details and keep the plain field map.
    pub fn into_values(self) -> DecryptedFieldMap {
        self.values
    }
}

/// Result of a successful [`FormFieldBinder::save_fields`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Fields encrypted and persisted, in submit order.
    pub saved: Vec<String>,
    /// Fields skipped because they were empty strings or `null`.
    pub skipped: Vec<String>,
}

/// Stateless orchestration of form loads and submits.
pub struct FormFieldBinder {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn ErrorReporter>,
    cipher: CipherService,
}

impl FormFieldBinder {
    /// Create a binder over `store`, reporting dropped fields to `reporter`.
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            store,
            reporter,
            cipher: CipherService::default(),
        }
    }

    /// Use a specific cipher configuration for saves.
    pub fn with_cipher(mut self, cipher: CipherService) -> Self {
        self.cipher = cipher;
        self
    }

    /// Decrypt `records` concurrently, isolating per-record failures.
    ///
    /// Never fails as a whole: a record that cannot be decrypted is omitted
    /// from [`LoadOutcome::values`], recorded in [`LoadOutcome::failed`] and
    /// reported. Returns once every record has settled.
    pub async fn load_fields(&self, records: Vec<FieldRecord>, key: &DeviceKey) -> LoadOutcome {
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(records.len());
        for record in records {
            let key = key.clone();
            let cipher = self.cipher;
            let handle = tasks.spawn_blocking(move || cipher.decrypt(&record.value, &key));
            pending.insert(handle.id(), record.field);
        }
        self.settle(tasks, pending).await
    }

    /// Collect decrypt results as they finish, attributing each to its field.
    ///
    /// A task that panics or is cancelled counts as an engine failure for its field.
    async fn settle(
        &self,
        mut tasks: JoinSet<Result<Value, CryptoError>>,
        mut pending: HashMap<task::Id, String>,
    ) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    warn!(error = %e, "field decryption task did not complete");
                    (e.id(), Err(CryptoError::EngineFailure))
                }
            };
            let Some(field) = pending.remove(&id) else {
                continue;
            };
            match result {
                Ok(value) => {
                    outcome.values.insert(field, value);
                }
                Err(error) => {
                    self.reporter.report(&field, &error);
                    outcome.failed.push(FieldFailure { field, error });
                }
            }
        }
        outcome.failed.sort_by(|a, b| a.field.cmp(&b.field));

        debug!(
            loaded = outcome.values.len(),
            failed = outcome.failed.len(),
            "form fields loaded"
        );
        outcome
    }

    /// Fetch `fields` from the record store, then [`load_fields`](Self::load_fields).
    ///
    /// # Errors
    ///
    /// Returns the store's error if the records cannot be listed.
    pub async fn load_from_store(
        &self,
        fields: &[String],
        key: &DeviceKey,
    ) -> Result<LoadOutcome, RecordStoreError> {
        let records = self.store.list(fields).await?;
        Ok(self.load_fields(records, key).await)
    }

    /// Encrypt and persist every non-blank field of `values`.
    ///
    /// Empty strings and `null` are skipped. Fields are processed in map
    /// order, one `set` call each.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] for the first field whose encrypt or persist
    /// step fails. Fields saved before it stay saved.
    pub async fn save_fields(
        &self,
        values: &Map<String, Value>,
        key: &DeviceKey,
    ) -> Result<SaveReport, SubmitError> {
        let mut report = SaveReport::default();
        for (field, value) in values {
            if is_blank(value) {
                report.skipped.push(field.clone());
                continue;
            }

            let ciphertext = match self.cipher.encrypt(value, key) {
                Ok(c) => c,
                Err(e) => return Err(submit_error(field, report, SubmitCause::Encrypt(e))),
            };
            if let Err(e) = self.store.set(field, &ciphertext).await {
                warn!(field = %field, error = %e, "failed to persist field");
                return Err(submit_error(field, report, SubmitCause::Persist(e)));
            }
            report.saved.push(field.clone());
        }

        debug!(
            saved = report.saved.len(),
            skipped = report.skipped.len(),
            "form fields saved"
        );
        Ok(report)
    }

    /// Delete the records with the given ids from the record store.
    pub async fn clear_fields(&self, ids: &[RecordId]) -> Result<(), RecordStoreError> {
        self.store.delete_by_ids(ids).await
    }

    /// Delete every record from the record store.
    pub async fn clear_all(&self) -> Result<(), RecordStoreError> {
        self.store.delete_all().await
    }
}

impl std::fmt::Debug for FormFieldBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFieldBinder")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn submit_error(field: &str, report: SaveReport, cause: SubmitCause) -> SubmitError {
    SubmitError {
        field: field.to_owned(),
        saved: report.saved,
        cause,
    }
}
