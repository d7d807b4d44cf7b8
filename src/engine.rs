// 🧮 Fee Engine - category + area + UF value + surcharge → three fee estimates
// Pure computation: no side effects, recomputed from scratch on every call.

use crate::error::EstimatorResult;
use crate::rates::{RateTable, RateTriple, Tier};
use serde::Serialize;

/// Smallest index rate accepted by the form (CLP per UF)
pub const MIN_INDEX_RATE: f64 = 1.0;

/// Negative, NaN and infinite input collapse to 0
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Index rate is never below 1 CLP per UF
pub fn clamp_index_rate(value: f64) -> f64 {
    if value.is_finite() && value > MIN_INDEX_RATE {
        value
    } else {
        MIN_INDEX_RATE
    }
}

/// `1 + surcharge% / 100`, with negative surcharge treated as none
pub fn surcharge_factor(surcharge_percent: f64) -> f64 {
    1.0 + clamp_non_negative(surcharge_percent) / 100.0
}

// ============================================================================
// FEE ESTIMATE
// ============================================================================

/// Fee for one tier, in UF and in CLP
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeEstimate {
    pub tier: Tier,
    /// UF per m² used for this tier
    pub rate: f64,
    pub total_units: f64,
    pub total_currency: f64,
}

/// The three tiers computed together
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeEstimates {
    pub low: FeeEstimate,
    pub mid: FeeEstimate,
    pub high: FeeEstimate,
}

impl FeeEstimates {
    pub fn get(&self, tier: Tier) -> &FeeEstimate {
        match tier {
            Tier::Low => &self.low,
            Tier::Mid => &self.mid,
            Tier::High => &self.high,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeeEstimate> {
        [&self.low, &self.mid, &self.high].into_iter()
    }
}

// ============================================================================
// FEE ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct FeeEngine {
    table: RateTable,
}

impl FeeEngine {
    pub fn new(table: RateTable) -> Self {
        FeeEngine { table }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Compute low/mid/high fees.
    ///
    /// Only an unknown category fails. Out-of-range numbers are clamped the
    /// same way the form clamps them: negative or NaN area and surcharge read
    /// as 0, an index rate below 1 reads as 1. A zero area yields all-zero
    /// estimates instead of an error.
    pub fn compute_estimates(
        &self,
        category: &str,
        area_sqm: f64,
        index_rate: f64,
        surcharge_percent: f64,
    ) -> EstimatorResult<FeeEstimates> {
        let rates = self.table.lookup(category)?;
        Ok(Self::compute_for_rates(rates, area_sqm, index_rate, surcharge_percent))
    }

    /// Same computation for an already resolved rate triple
    pub fn compute_for_rates(
        rates: RateTriple,
        area_sqm: f64,
        index_rate: f64,
        surcharge_percent: f64,
    ) -> FeeEstimates {
        let area = clamp_non_negative(area_sqm);
        let index_rate = clamp_index_rate(index_rate);
        let factor = surcharge_factor(surcharge_percent);

        let estimate = |tier: Tier| {
            let rate = rates.get(tier);
            let total_units = area * rate * factor;
            FeeEstimate {
                tier,
                rate,
                total_units,
                total_currency: total_units * index_rate,
            }
        };

        FeeEstimates {
            low: estimate(Tier::Low),
            mid: estimate(Tier::Mid),
            high: estimate(Tier::High),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;

    const EPS: f64 = 1e-9;

    fn engine() -> FeeEngine {
        FeeEngine::new(RateTable::builtin())
    }

    #[test]
    fn test_single_family_house_without_surcharge() {
        let est = engine()
            .compute_estimates("Vivienda unifamiliar", 100.0, 39428.0, 0.0)
            .unwrap();

        assert!((est.low.total_units - 80.0).abs() < EPS);
        assert!((est.mid.total_units - 90.0).abs() < EPS);
        assert!((est.high.total_units - 100.0).abs() < EPS);
        assert!((est.high.total_currency - 3_942_800.0).abs() < 1e-6);
        assert_eq!(est.mid.rate, 0.90);
        assert_eq!(est.low.tier, Tier::Low);
    }

    #[test]
    fn test_surcharge_applies_to_every_tier() {
        let est = engine()
            .compute_estimates("Vivienda unifamiliar", 100.0, 39428.0, 20.0)
            .unwrap();

        assert!((surcharge_factor(20.0) - 1.2).abs() < EPS);
        assert!((est.mid.total_units - 108.0).abs() < EPS);
        assert!((est.low.total_units - 96.0).abs() < EPS);
        assert!((est.high.total_units - 120.0).abs() < EPS);
    }

    #[test]
    fn test_zero_surcharge_reproduces_base_rate() {
        let table = RateTable::builtin();
        for row in table.rows() {
            let est = engine().compute_estimates(row.name, 37.5, 1000.0, 0.0).unwrap();
            for tier in Tier::ALL {
                assert_eq!(est.get(tier).total_units, 37.5 * row.rates.get(tier));
            }
        }
    }

    #[test]
    fn test_tiers_are_ordered_for_every_category() {
        for name in RateTable::builtin().categories() {
            let est = engine().compute_estimates(name, 250.0, 39428.0, 15.0).unwrap();
            assert!(est.low.total_units <= est.mid.total_units, "{}", name);
            assert!(est.mid.total_units <= est.high.total_units, "{}", name);
            assert!(est.low.total_currency <= est.high.total_currency, "{}", name);
        }
    }

    #[test]
    fn test_doubling_area_doubles_every_total() {
        let e = engine();
        for name in RateTable::builtin().categories() {
            let single = e.compute_estimates(name, 80.0, 39428.0, 10.0).unwrap();
            let double = e.compute_estimates(name, 160.0, 39428.0, 10.0).unwrap();
            for tier in Tier::ALL {
                let (a, b) = (single.get(tier), double.get(tier));
                assert!((b.total_units - 2.0 * a.total_units).abs() < 1e-9);
                assert!((b.total_currency - 2.0 * a.total_currency).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_zero_area_reports_zero() {
        let est = engine().compute_estimates("Vivienda económica", 0.0, 39428.0, 50.0).unwrap();
        for fee in est.iter() {
            assert_eq!(fee.total_units, 0.0);
            assert_eq!(fee.total_currency, 0.0);
        }
    }

    #[test]
    fn test_invalid_numbers_are_clamped_not_rejected() {
        let e = engine();
        let est = e.compute_estimates("Vivienda económica", -10.0, 39428.0, 0.0).unwrap();
        assert_eq!(est.high.total_units, 0.0);

        let est = e.compute_estimates("Vivienda económica", f64::NAN, 39428.0, 0.0).unwrap();
        assert_eq!(est.high.total_units, 0.0);

        let est = e.compute_estimates("Vivienda económica", 100.0, 39428.0, -30.0).unwrap();
        assert!((est.high.total_units - 60.0).abs() < EPS);

        let est = e.compute_estimates("Vivienda económica", 100.0, -5.0, 0.0).unwrap();
        assert!((est.high.total_currency - 60.0).abs() < EPS);
    }

    #[test]
    fn test_index_rate_below_one_reads_as_one() {
        let e = engine();
        for index_rate in [0.0, -39428.0, 0.5, f64::NAN] {
            let est = e.compute_estimates("Vivienda unifamiliar", 100.0, index_rate, 0.0).unwrap();
            assert!((est.high.total_currency - 100.0).abs() < EPS, "{}", index_rate);
            assert!((est.high.total_currency - est.high.total_units).abs() < EPS);
        }
    }

    #[test]
    fn test_unknown_category_fails() {
        let err = engine().compute_estimates("Bodega", 100.0, 39428.0, 0.0).unwrap_err();
        assert_eq!(err, EstimatorError::UnknownCategory("Bodega".to_string()));
    }

    #[test]
    fn test_clamp_helpers() {
        assert_eq!(clamp_non_negative(-1.0), 0.0);
        assert_eq!(clamp_non_negative(f64::INFINITY), 0.0);
        assert_eq!(clamp_non_negative(12.5), 12.5);
        assert_eq!(clamp_index_rate(0.0), MIN_INDEX_RATE);
        assert_eq!(clamp_index_rate(-39428.0), MIN_INDEX_RATE);
        assert_eq!(clamp_index_rate(f64::NAN), MIN_INDEX_RATE);
        assert_eq!(clamp_index_rate(39428.0), 39428.0);
    }
}
