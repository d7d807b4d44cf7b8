// 🏗️ Construction Reference - rough build budget shown next to the fees
// Never an input to the fee engine: it only multiplies CLP/m² by area.

use crate::engine::clamp_non_negative;

pub struct ConstructionReferenceEstimator;

impl ConstructionReferenceEstimator {
    /// `unit_cost * area`, or `None` when no usable unit cost was entered
    pub fn estimate(unit_cost: Option<f64>, area_sqm: f64) -> Option<f64> {
        let cost = unit_cost.filter(|c| c.is_finite() && *c > 0.0)?;
        Some(cost * clamp_non_negative(area_sqm))
    }

    /// Same as [`estimate`](Self::estimate) but from the raw text field
    pub fn estimate_from_input(unit_cost: &str, area_sqm: f64) -> Option<f64> {
        Self::estimate(unit_cost.trim().parse::<f64>().ok(), area_sqm)
    }
}
