//! Static reference data for the rule-based risk scorer.
//!
//! Holds the per-syndrome hard-marker lists, the numeric scoring rules attached to each
//! syndrome and the normative NT/FL tables. A [`ReferenceData`] is built once at startup
//! (normally with [`ReferenceData::builtin`]) and shared read-only behind an `Arc`.
//!
//! Finding labels are Turkish clinical terms and are matched byte-for-byte against the
//! labels submitted by the input form.

use std::collections::{BTreeMap, BTreeSet};

/// Finding label that gates the Down syndrome FL contribution.
pub const SHORT_LONG_BONES: &str = "Kısa uzun kemikler";

/// Mean and standard deviation of a measurement at one gestational week.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormativeEntry {
    pub mean: f64,
    pub sd: f64,
}

impl NormativeEntry {
    pub const fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }
}

/// The single femur-length reference point. FL is only scored at this week.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlReference {
    pub week: u32,
    pub entry: NormativeEntry,
}

/// Direction of a serum marker threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Comparison {
    /// Triggers when the value is strictly below the limit.
    Below(f64),
    /// Triggers when the value is strictly above the limit.
    Above(f64),
}

impl Comparison {
    pub fn triggers(&self, value: f64) -> bool {
        match *self {
            Comparison::Below(limit) => value < limit,
            Comparison::Above(limit) => value > limit,
        }
    }
}

/// A serum marker (PAPP-A or β-hCG) rule worth one point when it triggers.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerRule {
    pub comparison: Comparison,
    /// Qualifier shown next to the value in the contributing findings, e.g. "Düşük".
    pub label: String,
}

impl MarkerRule {
    pub fn below(limit: f64, label: impl Into<String>) -> Self {
        Self {
            comparison: Comparison::Below(limit),
            label: label.into(),
        }
    }

    pub fn above(limit: f64, label: impl Into<String>) -> Self {
        Self {
            comparison: Comparison::Above(limit),
            label: label.into(),
        }
    }
}

/// When a syndrome receives the FL tier points.
#[derive(Clone, Debug, PartialEq)]
pub enum FlRule {
    Ignored,
    Always,
    /// Only when the named structural finding is also selected.
    WithFinding(String),
}

/// Numeric-channel rules of one syndrome.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericRules {
    /// Adds the NT tier (1 or 2) when it is at least 1.
    pub nt: bool,
    pub pappa: Option<MarkerRule>,
    pub bhcg: Option<MarkerRule>,
    pub fl: FlRule,
}

impl NumericRules {
    /// A syndrome with no numeric channels.
    pub fn none() -> Self {
        Self {
            nt: false,
            pappa: None,
            bhcg: None,
            fl: FlRule::Ignored,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyndromeProfile {
    pub name: String,
    /// Qualifying structural findings, each worth one point.
    pub findings: Vec<String>,
    pub rules: NumericRules,
}

impl SyndromeProfile {
    pub fn new(name: impl Into<String>, findings: &[&str], rules: NumericRules) -> Self {
        Self {
            name: name.into(),
            findings: findings.iter().map(|f| (*f).to_string()).collect(),
            rules,
        }
    }
}

/// Immutable reference tables consumed by the z-score evaluator and the scorer.
#[derive(Clone, Debug)]
pub struct ReferenceData {
    syndromes: Vec<SyndromeProfile>,
    nt_by_week: BTreeMap<u32, NormativeEntry>,
    fl_reference: FlReference,
}

impl ReferenceData {
    pub fn new(
        syndromes: Vec<SyndromeProfile>,
        nt_by_week: BTreeMap<u32, NormativeEntry>,
        fl_reference: FlReference,
    ) -> Self {
        Self {
            syndromes,
            nt_by_week,
            fl_reference,
        }
    }

    /// The syndromes, findings and thresholds used by the clinic form.
    pub fn builtin() -> Self {
        let syndromes = vec![
            SyndromeProfile::new(
                "Down (Trizomi 21)",
                &[
                    "Atriyoventriküler septal defekt (AV kanal)",
                    "Duodenal atrezi (\"double-bubble\" işareti)",
                    "Nazal kemik yokluğu",
                    SHORT_LONG_BONES,
                ],
                NumericRules {
                    nt: true,
                    pappa: Some(MarkerRule::below(0.5, "Düşük")),
                    bhcg: Some(MarkerRule::above(2.0, "Yüksek")),
                    fl: FlRule::WithFinding(SHORT_LONG_BONES.to_string()),
                },
            ),
            SyndromeProfile::new(
                "Edwards (Trizomi 18)",
                &[
                    "Omfalosel / ön abdominal duvar defekti",
                    "Persistan \"clenched fist\" + rocker-bottom ayak postürü",
                    "Kompleks kardiyak defektler (TOF, HLHS vb.)",
                    "Mikrognati",
                    "Koroid Pleksus Kisti",
                ],
                NumericRules {
                    nt: true,
                    pappa: Some(MarkerRule::below(0.3, "Çok Düşük")),
                    bhcg: Some(MarkerRule::below(0.3, "Çok Düşük")),
                    fl: FlRule::Always,
                },
            ),
            SyndromeProfile::new(
                "Patau (Trizomi 13)",
                &[
                    "Alobar holoprozensefali (CNS orta-hat birleşme bozukluğu)",
                    "Orta-hat yüz yarıkları (yarık damak-dudak) ± proboscis",
                    "Postaksiyel polidaktili ± polikistik böbrek / büyük kardiyak defekt",
                ],
                NumericRules {
                    nt: true,
                    pappa: Some(MarkerRule::below(0.3, "Çok Düşük")),
                    bhcg: Some(MarkerRule::below(0.3, "Çok Düşük")),
                    fl: FlRule::Ignored,
                },
            ),
            SyndromeProfile::new(
                "Turner (45,X)",
                &[
                    "Septalı dev kistik higroma",
                    "Hidrops fetalis",
                    "Sol kalp obstrüksiyonları – özellikle aort koarktasyonu",
                ],
                NumericRules {
                    nt: true,
                    ..NumericRules::none()
                },
            ),
            SyndromeProfile::new(
                "DiGeorge (22q11.2 delesyonu)",
                &[
                    "Konotrunkal kalp defektleri (interrupted aortic arch tip B, truncus arteriosus, tetraloji vb.)",
                    "Timus hipoplazisi/agenesisi (ultrasonda timus yokluğu)",
                    "Sağ aortik ark veya vasküler ring anomalileri",
                ],
                NumericRules::none(),
            ),
        ];

        let nt_by_week = BTreeMap::from([
            (10, NormativeEntry::new(1.0, 0.4)),
            (11, NormativeEntry::new(1.0, 0.4)),
            (12, NormativeEntry::new(1.2, 0.45)),
            (13, NormativeEntry::new(1.4, 0.5)),
            (14, NormativeEntry::new(1.5, 0.5)),
        ]);

        let fl_reference = FlReference {
            week: 20,
            entry: NormativeEntry::new(29.5, 1.8),
        };

        Self::new(syndromes, nt_by_week, fl_reference)
    }

    /// Syndromes in declaration order. Ranking ties keep this order.
    pub fn syndromes(&self) -> &[SyndromeProfile] {
        &self.syndromes
    }

    pub fn nt_entry(&self, week: u32) -> Option<NormativeEntry> {
        self.nt_by_week.get(&week).copied()
    }

    pub fn fl_reference(&self) -> FlReference {
        self.fl_reference
    }

    /// Sorted, de-duplicated union of every syndrome's findings.
    pub fn vocabulary(&self) -> Vec<&str> {
        self.syndromes
            .iter()
            .flat_map(|s| s.findings.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_known_finding(&self, label: &str) -> bool {
        self.syndromes
            .iter()
            .any(|s| s.findings.iter().any(|f| f == label))
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_declares_five_syndromes_in_order() {
        let reference = ReferenceData::builtin();
        let names: Vec<&str> = reference
            .syndromes()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Down (Trizomi 21)",
                "Edwards (Trizomi 18)",
                "Patau (Trizomi 13)",
                "Turner (45,X)",
                "DiGeorge (22q11.2 delesyonu)",
            ]
        );
    }

    #[test]
    fn vocabulary_is_sorted_and_unique() {
        let reference = ReferenceData::builtin();
        let vocabulary = reference.vocabulary();

        let total: usize = reference.syndromes().iter().map(|s| s.findings.len()).sum();
        assert_eq!(vocabulary.len(), total);
        assert!(vocabulary.windows(2).all(|w| w[0] < w[1]));
        assert!(vocabulary.contains(&"Nazal kemik yokluğu"));
    }

    #[test]
    fn nt_table_covers_first_trimester_weeks_only() {
        let reference = ReferenceData::builtin();
        assert_eq!(reference.nt_entry(12), Some(NormativeEntry::new(1.2, 0.45)));
        assert_eq!(reference.nt_entry(9), None);
        assert_eq!(reference.nt_entry(25), None);
        assert_eq!(reference.fl_reference().week, 20);
    }

    #[test]
    fn comparison_is_strict() {
        assert!(Comparison::Below(0.5).triggers(0.49));
        assert!(!Comparison::Below(0.5).triggers(0.5));
        assert!(Comparison::Above(2.0).triggers(2.01));
        assert!(!Comparison::Above(2.0).triggers(2.0));
    }

    #[test]
    fn unknown_findings_are_not_in_vocabulary() {
        let reference = ReferenceData::builtin();
        assert!(reference.is_known_finding("Mikrognati"));
        assert!(!reference.is_known_finding("mikrognati"));
    }
}
