//! Z-score evaluation of ultrasound measurements.
//!
//! NT is scored against the weekly normative table when the week is tabulated and against
//! fixed absolute cut-offs otherwise. FL is only scored at the single reference week; there
//! is no normative data for other weeks, so they always evaluate to [`FlTier::Normal`].

use crate::reference::{NormativeEntry, ReferenceData};

/// NT cut-off (mm) for tier 1 when the week has no normative entry.
pub const NT_FALLBACK_ELEVATED_MM: f64 = 2.6;
/// NT cut-off (mm) for tier 2 when the week has no normative entry.
pub const NT_FALLBACK_CRITICAL_MM: f64 = 3.0;

/// Boundary tolerance so that `mean + k*sd` written in decimal lands on tier `k`.
const Z_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NtTier {
    Normal,
    /// z in [2, 3), or NT >= 2.6 mm without normative data.
    Elevated,
    /// z >= 3, or NT >= 3.0 mm without normative data.
    Critical,
}

impl NtTier {
    pub fn points(self) -> u32 {
        match self {
            NtTier::Normal => 0,
            NtTier::Elevated => 1,
            NtTier::Critical => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlTier {
    Normal,
    /// z <= -2 at the reference week.
    Short,
}

impl FlTier {
    pub fn points(self) -> u32 {
        match self {
            FlTier::Normal => 0,
            FlTier::Short => 2,
        }
    }
}

/// Standard score of `value`, or `None` when the entry has no usable spread.
pub fn z_score(value: f64, entry: NormativeEntry) -> Option<f64> {
    if entry.sd > 0.0 {
        Some((value - entry.mean) / entry.sd)
    } else {
        None
    }
}

pub fn evaluate_nt(reference: &ReferenceData, value: f64, week: u32) -> NtTier {
    match reference.nt_entry(week) {
        Some(entry) => match z_score(value, entry) {
            Some(z) if z >= 3.0 - Z_EPSILON => NtTier::Critical,
            Some(z) if z >= 2.0 - Z_EPSILON => NtTier::Elevated,
            _ => NtTier::Normal,
        },
        None => {
            if value >= NT_FALLBACK_CRITICAL_MM {
                NtTier::Critical
            } else if value >= NT_FALLBACK_ELEVATED_MM {
                NtTier::Elevated
            } else {
                NtTier::Normal
            }
        }
    }
}

pub fn evaluate_fl(reference: &ReferenceData, value: f64, week: u32) -> FlTier {
    let fl = reference.fl_reference();
    if week != fl.week {
        return FlTier::Normal;
    }
    match z_score(value, fl.entry) {
        Some(z) if z <= -2.0 + Z_EPSILON => FlTier::Short,
        _ => FlTier::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{FlReference, SyndromeProfile};
    use std::collections::BTreeMap;

    fn builtin() -> ReferenceData {
        ReferenceData::builtin()
    }

    #[test]
    fn tabulated_week_uses_z_score_tiers() {
        let reference = builtin();
        assert_eq!(evaluate_nt(&reference, 1.2, 12), NtTier::Normal);
        assert_eq!(evaluate_nt(&reference, 2.09, 12), NtTier::Normal);
        assert_eq!(evaluate_nt(&reference, 2.1, 12), NtTier::Elevated);
        assert_eq!(evaluate_nt(&reference, 2.55, 12), NtTier::Critical);
        assert_eq!(
            evaluate_nt(&reference, 1.2 + 3.0 * 0.45, 12),
            NtTier::Critical
        );
    }

    #[test]
    fn untabulated_week_uses_fixed_cut_offs() {
        let reference = builtin();
        assert_eq!(evaluate_nt(&reference, 2.5, 25), NtTier::Normal);
        assert_eq!(evaluate_nt(&reference, 2.6, 25), NtTier::Elevated);
        assert_eq!(evaluate_nt(&reference, 2.99, 25), NtTier::Elevated);
        assert_eq!(evaluate_nt(&reference, 3.0, 25), NtTier::Critical);
        assert_eq!(evaluate_nt(&reference, 6.0, 25), NtTier::Critical);
    }

    #[test]
    fn nt_tier_never_decreases_as_nt_grows() {
        let reference = builtin();
        for week in [10, 11, 12, 13, 14, 20, 40] {
            let mut previous = NtTier::Normal;
            for step in 0..=80 {
                let nt = f64::from(step) * 0.05;
                let tier = evaluate_nt(&reference, nt, week);
                assert!(tier >= previous, "week {week}, nt {nt}: {tier:?} < {previous:?}");
                previous = tier;
            }
        }
    }

    #[test]
    fn zero_sd_yields_normal_tier() {
        let reference = ReferenceData::new(
            Vec::<SyndromeProfile>::new(),
            BTreeMap::from([(12, NormativeEntry::new(1.2, 0.0))]),
            FlReference {
                week: 20,
                entry: NormativeEntry::new(29.5, 0.0),
            },
        );
        assert_eq!(evaluate_nt(&reference, 9.0, 12), NtTier::Normal);
        assert_eq!(evaluate_fl(&reference, 1.0, 20), FlTier::Normal);
    }

    #[test]
    fn fl_is_only_scored_at_week_twenty() {
        let reference = builtin();
        // 29.5 - 2 * 1.8 = 25.9
        assert_eq!(evaluate_fl(&reference, 25.9, 20), FlTier::Short);
        assert_eq!(evaluate_fl(&reference, 20.0, 20), FlTier::Short);
        assert_eq!(evaluate_fl(&reference, 26.0, 20), FlTier::Normal);
        assert_eq!(evaluate_fl(&reference, 20.0, 21), FlTier::Normal);
        assert_eq!(evaluate_fl(&reference, 5.0, 12), FlTier::Normal);
    }

    #[test]
    fn tier_points_match_channel_weights() {
        assert_eq!(NtTier::Normal.points(), 0);
        assert_eq!(NtTier::Elevated.points(), 1);
        assert_eq!(NtTier::Critical.points(), 2);
        assert_eq!(FlTier::Short.points(), 2);
    }
}
