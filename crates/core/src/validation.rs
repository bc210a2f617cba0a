//! Input validation utilities.
//!
//! These checks run at the outer boundaries (REST handlers, CLI) before an observation or
//! classifier input reaches the scoring or prediction code.

use crate::classifier::{FeatureValue, ModelInput};
use crate::constants::{MAX_GESTATIONAL_WEEK, MIN_GESTATIONAL_WEEK};
use crate::scoring::PatientObservation;
use crate::{CoreError, CoreResult};

/// Validates a measurement value: it must be finite and non-negative.
///
/// # Errors
///
/// Returns `CoreError::InvalidInput` naming the offending field.
pub fn validate_measurement(field: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::InvalidInput(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(CoreError::InvalidInput(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Validates an observation for the rule-based scorer.
///
/// The gestational week must lie within 10..=40 and every measurement must pass
/// [`validate_measurement`]. Findings are not checked against the vocabulary; unknown
/// labels simply never match.
pub fn validate_observation(observation: &PatientObservation) -> CoreResult<()> {
    let week = observation.gestational_week;
    if !(MIN_GESTATIONAL_WEEK..=MAX_GESTATIONAL_WEEK).contains(&week) {
        return Err(CoreError::InvalidInput(format!(
            "gestational_week must be between {MIN_GESTATIONAL_WEEK} and {MAX_GESTATIONAL_WEEK}"
        )));
    }

    validate_measurement("nt_mm", observation.nt_mm)?;
    validate_measurement("fl_mm", observation.fl_mm)?;
    validate_measurement("bhcg_mom", observation.bhcg_mom)?;
    validate_measurement("pappa_mom", observation.pappa_mom)?;
    Ok(())
}

/// Validates the numeric entries of a classifier input.
pub fn validate_model_input(input: &ModelInput) -> CoreResult<()> {
    for (name, value) in input {
        if let FeatureValue::Number(n) = value {
            validate_measurement(name, *n)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn observation(week: u32) -> PatientObservation {
        PatientObservation {
            gestational_week: week,
            nt_mm: 1.5,
            fl_mm: 30.0,
            bhcg_mom: 1.0,
            pappa_mom: 1.0,
            findings: BTreeSet::new(),
        }
    }

    #[test]
    fn accepts_week_bounds() {
        assert!(validate_observation(&observation(10)).is_ok());
        assert!(validate_observation(&observation(40)).is_ok());
    }

    #[test]
    fn rejects_week_out_of_range() {
        assert!(matches!(
            validate_observation(&observation(9)),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_observation(&observation(41)),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_negative_and_non_finite_measurements() {
        let mut obs = observation(12);
        obs.nt_mm = -0.1;
        assert!(validate_observation(&obs).is_err());

        let mut obs = observation(12);
        obs.pappa_mom = f64::NAN;
        assert!(validate_observation(&obs).is_err());

        let mut obs = observation(12);
        obs.bhcg_mom = f64::INFINITY;
        assert!(validate_observation(&obs).is_err());
    }

    #[test]
    fn model_input_checks_only_numbers() {
        let mut input = ModelInput::new();
        input.insert("Omfalosel".into(), FeatureValue::Category("Var".into()));
        input.insert("NT".into(), FeatureValue::Number(2.1));
        assert!(validate_model_input(&input).is_ok());

        input.insert("CRL".into(), FeatureValue::Number(-3.0));
        let err = validate_model_input(&input).expect_err("negative CRL should fail");
        assert!(err.to_string().contains("CRL"));
    }
}
