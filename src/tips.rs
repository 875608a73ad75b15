//! Tip-pool split: owed minus back/front-of-house shares and large-party
//! deductions, plus cash.

use crate::errors::TipError;
use crate::ledger::round_cents;
use crate::models::{DEFAULT_COST_PER_HEAD, LargeParty, TipPreset};
use serde::{Deserialize, Serialize};

const LARGE_PARTY_RATE: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipInputs {
    pub owed: Option<f64>,
    pub sales: Option<f64>,
    pub cash: Option<f64>,
    pub parties: Vec<LargeParty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TipBreakdown {
    pub boh: f64,
    pub foh: f64,
    pub large_party: f64,
    pub tips: f64,
    pub negative: bool,
}

impl TipBreakdown {
    /// Values rounded to cents for display; `negative` is taken before rounding.
    pub fn rounded(&self) -> Self {
        Self {
            boh: round_cents(self.boh),
            foh: round_cents(self.foh),
            large_party: round_cents(self.large_party),
            tips: round_cents(self.tips),
            negative: self.negative,
        }
    }
}

impl LargeParty {
    /// 1% of the party's subtotal. Parties missing either figure contribute nothing.
    pub fn deduction(&self) -> f64 {
        if self.headcount == 0.0 || self.cost_per_head == 0.0 {
            return 0.0;
        }
        self.headcount * self.cost_per_head * LARGE_PARTY_RATE
    }

    /// Applies a form edit; a blank or zero cost falls back to the default.
    pub fn with_values(headcount: Option<f64>, cost_per_head: Option<f64>) -> Self {
        Self {
            headcount: headcount.unwrap_or(0.0),
            cost_per_head: cost_per_head
                .filter(|cost| *cost != 0.0)
                .unwrap_or(DEFAULT_COST_PER_HEAD),
        }
    }
}

pub fn large_party_deduction(parties: &[LargeParty]) -> f64 {
    parties.iter().map(LargeParty::deduction).sum()
}

fn validate(inputs: &TipInputs) -> Result<(), TipError> {
    let invalid = |value: Option<f64>| value.is_some_and(|v| !v.is_finite() || v < 0.0);

    let mut fields = Vec::new();
    if invalid(inputs.owed) {
        fields.push("owed");
    }
    if invalid(inputs.sales) {
        fields.push("sales");
    }
    if inputs.cash.is_some_and(|cash| !cash.is_finite()) {
        fields.push("cash");
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(TipError::InvalidInput { fields })
    }
}

/// Unrounded tip split. Missing inputs count as zero.
pub fn calculate(inputs: &TipInputs, preset: TipPreset) -> Result<TipBreakdown, TipError> {
    validate(inputs)?;

    let owed = inputs.owed.unwrap_or(0.0);
    let sales = inputs.sales.unwrap_or(0.0);
    let cash = inputs.cash.unwrap_or(0.0);

    let boh = sales * preset.boh / 100.0;
    let foh = sales * preset.foh / 100.0;
    let large_party = large_party_deduction(&inputs.parties);
    let tips = owed - (boh + foh) - large_party + cash;

    Ok(TipBreakdown {
        boh,
        foh,
        large_party,
        tips,
        negative: tips < 0.0,
    })
}

/// A preset edit awaiting explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresetChange {
    Save(TipPreset),
    Reset,
}

impl PresetChange {
    pub fn propose(boh: f64, foh: f64) -> Result<Self, TipError> {
        let valid = |value: f64| value.is_finite() && value >= 0.0;
        if !valid(boh) || !valid(foh) {
            return Err(TipError::InvalidPercent);
        }
        Ok(PresetChange::Save(TipPreset { boh, foh }))
    }

    pub fn preset(&self) -> TipPreset {
        match self {
            PresetChange::Save(preset) => *preset,
            PresetChange::Reset => TipPreset::default(),
        }
    }

    pub fn prompt(&self) -> String {
        let preset = self.preset();
        let verb = match self {
            PresetChange::Save(_) => "Save",
            PresetChange::Reset => "Reset",
        };
        format!(
            "{verb} Back of House to {}% and Support to {}%?",
            preset.boh, preset.foh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(left: f64, right: f64) {
        assert!((left - right).abs() < 1e-9, "{left} != {right}");
    }

    #[test]
    fn calculates_reference_shift() {
        let inputs = TipInputs {
            owed: Some(500.0),
            sales: Some(2000.0),
            cash: Some(50.0),
            parties: vec![LargeParty {
                headcount: 20.0,
                cost_per_head: 65.0,
            }],
        };
        let result = calculate(&inputs, TipPreset::default()).unwrap().rounded();

        assert_close(result.large_party, 13.0);
        assert_close(result.boh, 100.0);
        assert_close(result.foh, 60.0);
        assert_close(result.tips, 377.0);
        assert!(!result.negative);
    }

    #[test]
    fn flags_negative_tips() {
        let inputs = TipInputs {
            owed: Some(10.0),
            sales: Some(1000.0),
            ..TipInputs::default()
        };
        let result = calculate(&inputs, TipPreset::default()).unwrap();
        assert_close(result.tips, -70.0);
        assert!(result.negative);
    }

    #[test]
    fn rejects_negative_owed_and_sales() {
        let inputs = TipInputs {
            owed: Some(-1.0),
            sales: Some(-5.0),
            cash: Some(-20.0),
            parties: Vec::new(),
        };
        assert_eq!(
            calculate(&inputs, TipPreset::default()),
            Err(TipError::InvalidInput {
                fields: vec!["owed", "sales"]
            })
        );
    }

    #[test]
    fn empty_inputs_compute_zero() {
        let result = calculate(&TipInputs::default(), TipPreset::default()).unwrap();
        assert_eq!(result.tips, 0.0);
        assert!(!result.negative);
    }

    #[test]
    fn incomplete_parties_are_ignored() {
        let parties = [
            LargeParty {
                headcount: 0.0,
                cost_per_head: 65.0,
            },
            LargeParty::with_values(Some(10.0), None),
            LargeParty::with_values(Some(8.0), Some(50.0)),
        ];
        assert_close(large_party_deduction(&parties), 6.5 + 4.0);
    }

    #[test]
    fn custom_preset_changes_shares() {
        let inputs = TipInputs {
            owed: Some(300.0),
            sales: Some(1000.0),
            ..TipInputs::default()
        };
        let preset = TipPreset { boh: 2.5, foh: 0.0 };
        let result = calculate(&inputs, preset).unwrap();
        assert_close(result.boh, 25.0);
        assert_close(result.foh, 0.0);
        assert_close(result.tips, 275.0);
    }

    #[test]
    fn preset_changes_need_valid_percentages() {
        assert_eq!(PresetChange::propose(-1.0, 3.0), Err(TipError::InvalidPercent));
        assert_eq!(PresetChange::propose(5.0, f64::NAN), Err(TipError::InvalidPercent));

        let change = PresetChange::propose(4.5, 2.0).unwrap();
        assert_eq!(change.prompt(), "Save Back of House to 4.5% and Support to 2%?");
        assert_eq!(
            PresetChange::Reset.prompt(),
            "Reset Back of House to 5% and Support to 3%?"
        );
        assert_eq!(PresetChange::Reset.preset(), TipPreset::default());
    }
}
