//! Request and response bodies of the Perisentez APIs.

use perisentez_core::classifier::{
    ClassProbability, FeatureValue, BINARY_OPTIONS, FORM_CATEGORICAL_FEATURES,
    FORM_NUMERIC_FEATURES, SEX_FEATURE, SEX_OPTIONS,
};
use perisentez_core::records::PatientRecord;
use perisentez_core::scoring::{PatientObservation, SyndromeScore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub username: String,
    /// Send back in the `x-session-token` header.
    pub token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutRes {
    pub ok: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FindingsRes {
    pub findings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssessmentReq {
    pub gestational_week: u32,
    pub nt_mm: f64,
    pub fl_mm: f64,
    pub bhcg_mom: f64,
    pub pappa_mom: f64,
    #[serde(default)]
    pub findings: BTreeSet<String>,
    /// Also return syndromes that scored zero.
    #[serde(default)]
    pub include_all: bool,
}

impl AssessmentReq {
    pub fn observation(&self) -> PatientObservation {
        PatientObservation {
            gestational_week: self.gestational_week,
            nt_mm: self.nt_mm,
            fl_mm: self.fl_mm,
            bhcg_mom: self.bhcg_mom,
            pappa_mom: self.pappa_mom,
            findings: self.findings.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyndromeScoreDto {
    pub syndrome: String,
    pub raw_points: u32,
    pub max_points: u32,
    pub percentage: f64,
    pub contributing: Vec<String>,
}

impl From<SyndromeScore> for SyndromeScoreDto {
    fn from(s: SyndromeScore) -> Self {
        Self {
            syndrome: s.syndrome,
            raw_points: s.raw_points,
            max_points: s.max_points,
            percentage: s.percentage,
            contributing: s.contributing,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssessmentRes {
    /// Highest percentage first.
    pub scores: Vec<SyndromeScoreDto>,
}

/// Fields of the prediction form and their allowed answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionFormRes {
    /// Answered with one of `binary_options`.
    pub categorical_features: Vec<String>,
    /// Answered with one of `sex_options`.
    pub sex_feature: String,
    pub numeric_features: Vec<String>,
    pub binary_options: Vec<String>,
    pub sex_options: Vec<String>,
}

impl Default for PredictionFormRes {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        }
        Self {
            categorical_features: owned(FORM_CATEGORICAL_FEATURES),
            sex_feature: SEX_FEATURE.to_string(),
            numeric_features: owned(FORM_NUMERIC_FEATURES),
            binary_options: owned(BINARY_OPTIONS),
            sex_options: owned(SEX_OPTIONS),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PredictionReq {
    pub patient_name: String,
    /// Form answers keyed by feature name: numbers for measurements, labels for categories.
    #[schema(value_type = Object)]
    pub features: BTreeMap<String, FeatureValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassProbabilityDto {
    pub class: String,
    /// Percentage rounded to two decimals.
    pub percent: f64,
}

impl From<&ClassProbability> for ClassProbabilityDto {
    fn from(p: &ClassProbability) -> Self {
        Self {
            class: p.class.clone(),
            percent: p.percent(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordRes {
    pub id: String,
    pub patient_name: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub predicted_syndrome: String,
    pub probability_percent: f64,
    pub probabilities: Vec<ClassProbabilityDto>,
    pub has_report: bool,
}

impl From<PatientRecord> for RecordRes {
    fn from(r: PatientRecord) -> Self {
        Self {
            id: r.id.to_string(),
            patient_name: r.patient_name.into_inner(),
            created_at: r.created_at.to_rfc3339(),
            predicted_syndrome: r.predicted_syndrome,
            probability_percent: r.probability_percent,
            probabilities: r.probabilities.iter().map(ClassProbabilityDto::from).collect(),
            has_report: r.report_file.is_some(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub records: Vec<RecordRes>,
}
