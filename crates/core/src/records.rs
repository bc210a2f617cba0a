//! Per-clinician patient record storage.
//!
//! Every saved prediction becomes one record directory:
//!
//! ```text
//! records/
//!   <clinician>/
//!     <s1>/<s2>/<record-id>/
//!       record.yaml   # PatientRecord
//!       report.pdf    # rendered prediction report
//! ```
//!
//! Records are always addressed through the owning clinician, so one clinician's id cannot
//! reach another clinician's directory.

use crate::classifier::ClassProbability;
use crate::config::CoreConfig;
use crate::constants::{RECORD_FILENAME, REPORT_FILENAME};
use crate::ids::RecordId;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use perisentez_types::{NonEmptyText, Username};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: RecordId,
    pub clinician: Username,
    pub patient_name: NonEmptyText,
    pub created_at: DateTime<Utc>,
    pub predicted_syndrome: String,
    /// Probability of the predicted syndrome, as a percentage.
    pub probability_percent: f64,
    pub probabilities: Vec<ClassProbability>,
    /// Report filename inside the record directory, when one was stored.
    #[serde(default)]
    pub report_file: Option<String>,
}

/// Input for [`RecordService::save`].
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub patient_name: NonEmptyText,
    pub created_at: DateTime<Utc>,
    /// Class probabilities, highest first.
    pub probabilities: Vec<ClassProbability>,
}

#[derive(Clone, Debug)]
pub struct RecordService {
    cfg: Arc<CoreConfig>,
}

impl RecordService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn clinician_dir(&self, clinician: &Username) -> PathBuf {
        self.cfg.records_dir().join(clinician.as_str())
    }

    fn record_dir(&self, clinician: &Username, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.clinician_dir(clinician))
    }

    /// Persists a new record and, when given, its PDF report.
    ///
    /// If writing fails part-way the record directory is removed again.
    pub fn save(
        &self,
        clinician: &Username,
        record: NewRecord,
        report_pdf: Option<&[u8]>,
    ) -> CoreResult<PatientRecord> {
        let top = record
            .probabilities
            .first()
            .ok_or_else(|| CoreError::InvalidInput("record has no probabilities".into()))?;

        let id = RecordId::new();
        let dir = self.record_dir(clinician, &id);
        fs::create_dir_all(&dir).map_err(CoreError::StorageDirCreation)?;

        let stored = PatientRecord {
            id: id.clone(),
            clinician: clinician.clone(),
            patient_name: record.patient_name,
            created_at: record.created_at,
            predicted_syndrome: top.class.clone(),
            probability_percent: top.probability * 100.0,
            probabilities: record.probabilities.clone(),
            report_file: report_pdf.map(|_| REPORT_FILENAME.to_string()),
        };

        if let Err(e) = write_record(&dir, &stored, report_pdf) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::error!(
                    "failed to clean up record directory {}: {}",
                    dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!(clinician = %clinician, record = %id, "saved patient record");
        Ok(stored)
    }

    /// All records of `clinician`, newest first. Unreadable records are skipped.
    pub fn list(&self, clinician: &Username) -> Vec<PatientRecord> {
        let mut records = Vec::new();
        let base = self.clinician_dir(clinician);

        let Ok(s1_iter) = fs::read_dir(&base) else {
            return records;
        };
        for s1 in s1_iter.flatten() {
            let Ok(s2_iter) = fs::read_dir(s1.path()) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let Ok(id_iter) = fs::read_dir(s2.path()) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let path = id_ent.path().join(RECORD_FILENAME);
                    if !path.is_file() {
                        continue;
                    }
                    match read_record(&path) {
                        Ok(record) if &record.clinician == clinician => records.push(record),
                        Ok(_) => {
                            tracing::warn!("record owner mismatch: {}", path.display());
                        }
                        Err(e) => {
                            tracing::warn!("failed to parse {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Records whose patient name contains `term`, case-insensitively. A blank term lists all.
    pub fn search(&self, clinician: &Username, term: &str) -> Vec<PatientRecord> {
        let needle = term.trim().to_lowercase();
        let records = self.list(clinician);
        if needle.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|r| r.patient_name.as_str().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn get(&self, clinician: &Username, id: &RecordId) -> CoreResult<PatientRecord> {
        let path = self.record_dir(clinician, id).join(RECORD_FILENAME);
        if !path.is_file() {
            return Err(CoreError::RecordNotFound(id.to_string()));
        }
        read_record(&path)
    }

    pub fn read_report(&self, clinician: &Username, id: &RecordId) -> CoreResult<Vec<u8>> {
        let record = self.get(clinician, id)?;
        let filename = record
            .report_file
            .ok_or_else(|| CoreError::RecordNotFound(format!("{id} has no report")))?;
        let path = self.record_dir(clinician, id).join(filename);
        if !path.is_file() {
            return Err(CoreError::RecordNotFound(format!("{id} report is missing")));
        }
        fs::read(path).map_err(CoreError::FileRead)
    }

    pub fn delete(&self, clinician: &Username, id: &RecordId) -> CoreResult<()> {
        let dir = self.record_dir(clinician, id);
        if !dir.join(RECORD_FILENAME).is_file() {
            return Err(CoreError::RecordNotFound(id.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(CoreError::FileRemove)?;
        tracing::info!(clinician = %clinician, record = %id, "deleted patient record");
        Ok(())
    }
}

fn write_record(dir: &Path, record: &PatientRecord, report_pdf: Option<&[u8]>) -> CoreResult<()> {
    if let Some(bytes) = report_pdf {
        fs::write(dir.join(REPORT_FILENAME), bytes).map_err(CoreError::FileWrite)?;
    }
    let yaml = serde_yaml::to_string(record).map_err(CoreError::YamlSerialization)?;
    fs::write(dir.join(RECORD_FILENAME), yaml).map_err(CoreError::FileWrite)
}

fn read_record(path: &Path) -> CoreResult<PatientRecord> {
    let raw = fs::read_to_string(path).map_err(CoreError::FileRead)?;
    serde_yaml::from_str(&raw).map_err(CoreError::YamlDeserialization)
}
