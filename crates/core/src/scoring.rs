//! Rule-based syndrome scoring and ranking.
//!
//! Each syndrome earns one point per selected structural finding from its marker list, plus
//! the points of whichever numeric channels its [`NumericRules`] enable. The raw total is
//! normalised against `findings + 3` and clamped to 100.
//!
//! Scoring is a pure function of the observation and the reference tables. [`score`] always
//! returns one entry per syndrome in declaration order; callers that only want to display
//! syndromes with some evidence filter on [`SyndromeScore::is_reportable`].

use crate::constants::NUMERIC_HEADROOM_POINTS;
use crate::reference::{FlRule, MarkerRule, NumericRules, ReferenceData, SyndromeProfile};
use crate::zscore::{evaluate_fl, evaluate_nt, FlTier, NtTier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One evaluation request from the input form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientObservation {
    pub gestational_week: u32,
    pub nt_mm: f64,
    pub fl_mm: f64,
    pub bhcg_mom: f64,
    pub pappa_mom: f64,
    #[serde(default)]
    pub findings: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyndromeScore {
    pub syndrome: String,
    pub raw_points: u32,
    pub max_points: u32,
    /// `min(100, 100 * raw_points / max_points)`.
    pub percentage: f64,
    /// Matched findings followed by descriptions of triggered numeric channels.
    pub contributing: Vec<String>,
}

impl SyndromeScore {
    pub fn is_reportable(&self) -> bool {
        self.percentage > 0.0 || !self.contributing.is_empty()
    }
}

/// Tiers shared by every syndrome for one observation.
#[derive(Clone, Copy, Debug)]
struct ChannelTiers {
    nt: NtTier,
    fl: FlTier,
}

/// Scores every syndrome in `reference` for `observation`, in declaration order.
pub fn score(reference: &ReferenceData, observation: &PatientObservation) -> Vec<SyndromeScore> {
    let tiers = ChannelTiers {
        nt: evaluate_nt(reference, observation.nt_mm, observation.gestational_week),
        fl: evaluate_fl(reference, observation.fl_mm, observation.gestational_week),
    };
    tracing::debug!(
        week = observation.gestational_week,
        nt_tier = ?tiers.nt,
        fl_tier = ?tiers.fl,
        "evaluated numeric channels"
    );

    reference
        .syndromes()
        .iter()
        .map(|syndrome| score_syndrome(syndrome, observation, tiers))
        .collect()
}

fn score_syndrome(
    syndrome: &SyndromeProfile,
    observation: &PatientObservation,
    tiers: ChannelTiers,
) -> SyndromeScore {
    let mut contributing = Contributing::default();

    let mut structural_points = 0;
    for finding in &syndrome.findings {
        if observation.findings.contains(finding) {
            structural_points += 1;
            contributing.push(finding.clone());
        }
    }

    let numeric_points = numeric_points(&syndrome.rules, observation, tiers, &mut contributing);
    let raw_points = structural_points + numeric_points;

    let max_points = match syndrome.findings.len() as u32 + NUMERIC_HEADROOM_POINTS {
        0 => 1,
        n => n,
    };
    let percentage = (100.0 * f64::from(raw_points) / f64::from(max_points)).min(100.0);

    tracing::debug!(
        syndrome = %syndrome.name,
        structural_points,
        numeric_points,
        percentage,
        "scored syndrome"
    );

    SyndromeScore {
        syndrome: syndrome.name.clone(),
        raw_points,
        max_points,
        percentage,
        contributing: contributing.into_inner(),
    }
}

fn numeric_points(
    rules: &NumericRules,
    observation: &PatientObservation,
    tiers: ChannelTiers,
    contributing: &mut Contributing,
) -> u32 {
    let mut points = 0;

    if rules.nt && tiers.nt >= NtTier::Elevated {
        points += tiers.nt.points();
        let qualifier = match tiers.nt {
            NtTier::Critical => "Çok Yüksek/Kritik",
            _ => "Yüksek",
        };
        contributing.push(format!(
            "NT (Ense Kalınlığı): {:?} mm ({})",
            observation.nt_mm, qualifier
        ));
    }

    if marker_triggers(rules.pappa.as_ref(), observation.pappa_mom) {
        points += 1;
        if let Some(rule) = &rules.pappa {
            contributing.push(format!(
                "PAPP-A (MoM): {:?} ({})",
                observation.pappa_mom, rule.label
            ));
        }
    }

    if marker_triggers(rules.bhcg.as_ref(), observation.bhcg_mom) {
        points += 1;
        if let Some(rule) = &rules.bhcg {
            contributing.push(format!(
                "βhCG (MoM): {:?} ({})",
                observation.bhcg_mom, rule.label
            ));
        }
    }

    let fl_applies = match &rules.fl {
        FlRule::Ignored => false,
        FlRule::Always => true,
        FlRule::WithFinding(label) => observation.findings.contains(label),
    };
    if fl_applies && tiers.fl >= FlTier::Short {
        points += tiers.fl.points();
        contributing.push(format!(
            "FL (Femur Uzunluğu): {:?} mm (Kısa)",
            observation.fl_mm
        ));
    }

    points
}

fn marker_triggers(rule: Option<&MarkerRule>, value: f64) -> bool {
    rule.is_some_and(|r| r.comparison.triggers(value))
}

/// Insertion-ordered, de-duplicated list of contributing findings.
#[derive(Default)]
struct Contributing(Vec<String>);

impl Contributing {
    fn push(&mut self, item: String) {
        if !self.0.contains(&item) {
            self.0.push(item);
        }
    }

    fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Sorts by percentage, highest first. Equal percentages keep their input order.
pub fn rank(mut scores: Vec<SyndromeScore>) -> Vec<SyndromeScore> {
    scores.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    scores
}

/// Scores and ranks in one step.
pub fn assess(reference: &ReferenceData, observation: &PatientObservation) -> Vec<SyndromeScore> {
    rank(score(reference, observation))
}
