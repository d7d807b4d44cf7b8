// 📝 Form State - the single mutable record behind the estimator
//
// Every setter clamps its input and then recomputes every derived value,
// so readers never see estimates that lag behind the inputs.

use crate::config::EstimatorConfig;
use crate::construction::ConstructionReferenceEstimator;
use crate::engine::{clamp_index_rate, clamp_non_negative, FeeEngine, FeeEstimates};
use crate::error::{EstimatorError, EstimatorResult, FetchError};
use crate::format::{format_clp, format_number, format_uf};
use crate::index_rate::{IndexRateProvider, IndexRateQuote};
use crate::rates::{CategoryRate, RateTable, RateTriple, Tier, DEFAULT_CATEGORY};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// INDEX RATE SOURCE
// ============================================================================

/// Where the current UF value came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexRateSource {
    /// Built-in or configured constant
    Default,
    /// Typed by the user
    Manual,
    /// Automatic fetch
    Fetched {
        as_of: Option<DateTime<Utc>>,
        fetched_at: DateTime<Utc>,
    },
}

// ============================================================================
// FORM STATE
// ============================================================================

#[derive(Debug, Clone)]
pub struct FormState {
    table: RateTable,
    category: &'static CategoryRate,
    area_sqm: f64,
    index_rate: f64,
    index_rate_source: IndexRateSource,
    surcharge_percent: f64,
    construction_unit_cost: Option<f64>,

    // Derived
    estimates: FeeEstimates,
    construction_reference: Option<f64>,
}

impl FormState {
    /// Session defaults: single-family house, 100 m², built-in UF value, no surcharge
    pub fn new() -> Self {
        let table = RateTable::builtin();
        let category = table
            .get(DEFAULT_CATEGORY)
            .unwrap_or(&table.rows()[0]);

        let mut form = FormState {
            table,
            category,
            area_sqm: crate::config::DEFAULT_AREA_SQM,
            index_rate: crate::config::DEFAULT_INDEX_RATE,
            index_rate_source: IndexRateSource::Default,
            surcharge_percent: 0.0,
            construction_unit_cost: None,
            estimates: FeeEngine::compute_for_rates(category.rates, 0.0, 0.0, 0.0),
            construction_reference: None,
        };
        form.recompute();
        form
    }

    /// Defaults taken from configuration (still clamped)
    pub fn from_config(config: &EstimatorConfig) -> EstimatorResult<Self> {
        let mut form = Self::new();
        form.set_category(&config.default_category)?;
        form.area_sqm = clamp_non_negative(config.default_area_sqm);
        form.index_rate = clamp_index_rate(config.default_index_rate);
        form.recompute();
        Ok(form)
    }

    fn recompute(&mut self) {
        self.estimates = FeeEngine::compute_for_rates(
            self.category.rates,
            self.area_sqm,
            self.index_rate,
            self.surcharge_percent,
        );
        self.construction_reference =
            ConstructionReferenceEstimator::estimate(self.construction_unit_cost, self.area_sqm);
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Select a category; unknown names leave the form untouched
    pub fn set_category(&mut self, name: &str) -> EstimatorResult<()> {
        let category = self
            .table
            .get(name)
            .ok_or_else(|| EstimatorError::UnknownCategory(name.to_string()))?;
        self.category = category;
        self.recompute();
        Ok(())
    }

    pub fn next_category(&mut self) {
        let name = self.table.next_category(self.category.name);
        if let Some(category) = self.table.get(name) {
            self.category = category;
            self.recompute();
        }
    }

    pub fn previous_category(&mut self) {
        let name = self.table.previous_category(self.category.name);
        if let Some(category) = self.table.get(name) {
            self.category = category;
            self.recompute();
        }
    }

    pub fn set_area(&mut self, area_sqm: f64) {
        self.area_sqm = clamp_non_negative(area_sqm);
        if self.area_sqm != area_sqm {
            debug!("Area {} clamped to {}", area_sqm, self.area_sqm);
        }
        self.recompute();
    }

    /// Manual UF value; anything below 1 becomes 1
    pub fn set_index_rate(&mut self, index_rate: f64) {
        self.index_rate = clamp_index_rate(index_rate);
        if self.index_rate != index_rate {
            debug!("Index rate {} clamped to {}", index_rate, self.index_rate);
        }
        self.index_rate_source = IndexRateSource::Manual;
        self.recompute();
    }

    pub fn set_surcharge_percent(&mut self, surcharge_percent: f64) {
        self.surcharge_percent = clamp_non_negative(surcharge_percent);
        if self.surcharge_percent != surcharge_percent {
            debug!("Surcharge {} clamped to {}", surcharge_percent, self.surcharge_percent);
        }
        self.recompute();
    }

    /// CLP/m² for the construction reference; `None` clears it
    pub fn set_construction_unit_cost(&mut self, unit_cost: Option<f64>) {
        self.construction_unit_cost = unit_cost.map(clamp_non_negative);
        self.recompute();
    }

    // Raw text from an input box. Empty text reads as 0 and so does text
    // that is not a number; the setters above then clamp as usual.

    pub fn set_area_input(&mut self, text: &str) {
        self.set_area(parse_number(text).unwrap_or(0.0));
    }

    pub fn set_index_rate_input(&mut self, text: &str) {
        self.set_index_rate(parse_number(text).unwrap_or(0.0));
    }

    pub fn set_surcharge_input(&mut self, text: &str) {
        self.set_surcharge_percent(parse_number(text).unwrap_or(0.0));
    }

    /// Empty or non-numeric text leaves the construction cost unset
    pub fn set_construction_unit_cost_input(&mut self, text: &str) {
        let value = if text.trim().is_empty() {
            None
        } else {
            text.trim().parse::<f64>().ok()
        };
        self.set_construction_unit_cost(value);
    }

    /// Write back a fetched UF value
    pub fn apply_fetched_rate(&mut self, quote: IndexRateQuote) {
        self.index_rate = clamp_index_rate(quote.value);
        self.index_rate_source = IndexRateSource::Fetched {
            as_of: quote.as_of,
            fetched_at: Utc::now(),
        };
        self.recompute();
    }

    /// Apply a fetch outcome: success overwrites the UF value, failure
    /// changes nothing and is handed back for the caller to report.
    pub fn apply_fetch_result(
        &mut self,
        result: Result<IndexRateQuote, FetchError>,
    ) -> Result<f64, FetchError> {
        let quote = result?;
        self.apply_fetched_rate(quote);
        Ok(self.index_rate)
    }

    /// Fetch the UF value and apply it
    pub async fn fetch_index_rate(
        &mut self,
        provider: &IndexRateProvider,
    ) -> Result<f64, FetchError> {
        let result = provider.fetch_current_rate().await;
        self.apply_fetch_result(result)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    pub fn selected_category(&self) -> &'static str {
        self.category.name
    }

    pub fn rates(&self) -> RateTriple {
        self.category.rates
    }

    pub fn area_sqm(&self) -> f64 {
        self.area_sqm
    }

    pub fn index_rate(&self) -> f64 {
        self.index_rate
    }

    pub fn index_rate_source(&self) -> IndexRateSource {
        self.index_rate_source
    }

    pub fn surcharge_percent(&self) -> f64 {
        self.surcharge_percent
    }

    pub fn construction_unit_cost(&self) -> Option<f64> {
        self.construction_unit_cost
    }

    pub fn estimates(&self) -> &FeeEstimates {
        &self.estimates
    }

    pub fn construction_reference(&self) -> Option<f64> {
        self.construction_reference
    }

    /// `"0.800 UF · 0.900 UF · 1.000 UF"`
    pub fn rate_band_line(&self) -> String {
        let rates = self.category.rates;
        format!(
            "{} · {} · {}",
            format_uf(rates.low),
            format_uf(rates.mid),
            format_uf(rates.high)
        )
    }

    /// `"Base: 0.900 UF · m²: 100"`, plus the surcharge when there is one
    pub fn basis_line(&self, tier: Tier) -> String {
        let mut line = format!(
            "Base: {} · m²: {}",
            format_uf(self.estimates.get(tier).rate),
            format_number(self.area_sqm)
        );
        if self.surcharge_percent > 0.0 {
            line.push_str(&format!(" · recargo: {}%", format_number(self.surcharge_percent)));
        }
        line
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let cards = Tier::ALL
            .iter()
            .map(|&tier| {
                let fee = self.estimates.get(tier);
                FeeCard {
                    label: tier.label(),
                    total_units: format_uf(fee.total_units),
                    total_currency: format_clp(fee.total_currency),
                    basis: self.basis_line(tier),
                }
            })
            .collect();

        FormSnapshot {
            category: self.category.name.to_string(),
            area_sqm: self.area_sqm,
            index_rate: self.index_rate,
            index_rate_source: self.index_rate_source,
            surcharge_percent: self.surcharge_percent,
            construction_unit_cost: self.construction_unit_cost,
            rates: self.category.rates,
            estimates: self.estimates,
            construction_reference: self.construction_reference,
            display: FormDisplay {
                rate_band: self.rate_band_line(),
                cards,
                construction_reference: self.construction_reference.map(format_clp),
            },
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    text.parse::<f64>().ok()
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Inputs, outputs and their rendered strings at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub category: String,
    pub area_sqm: f64,
    pub index_rate: f64,
    pub index_rate_source: IndexRateSource,
    pub surcharge_percent: f64,
    pub construction_unit_cost: Option<f64>,
    pub rates: RateTriple,
    pub estimates: FeeEstimates,
    pub construction_reference: Option<f64>,
    pub display: FormDisplay,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormDisplay {
    pub rate_band: String,
    pub cards: Vec<FeeCard>,
    pub construction_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeCard {
    pub label: &'static str,
    pub total_units: String,
    pub total_currency: String,
    pub basis: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_defaults() {
        let form = FormState::new();
        assert_eq!(form.selected_category(), "Vivienda unifamiliar");
        assert_eq!(form.area_sqm(), 100.0);
        assert_eq!(form.index_rate(), 39428.0);
        assert_eq!(form.surcharge_percent(), 0.0);
        assert_eq!(form.construction_unit_cost(), None);
        assert_eq!(form.construction_reference(), None);
        assert_eq!(form.index_rate_source(), IndexRateSource::Default);

        let est = form.estimates();
        assert!((est.high.total_units - 100.0).abs() < EPS);
        assert!((est.high.total_currency - 3_942_800.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_write_recomputes() {
        let mut form = FormState::new();

        form.set_surcharge_percent(20.0);
        assert!((form.estimates().mid.total_units - 108.0).abs() < EPS);

        form.set_area(50.0);
        assert!((form.estimates().mid.total_units - 54.0).abs() < EPS);

        form.set_category("Vivienda económica").unwrap();
        assert!((form.estimates().mid.total_units - 50.0 * 0.525 * 1.2).abs() < EPS);

        form.set_index_rate(40000.0);
        let mid = form.estimates().mid;
        assert!((mid.total_currency - mid.total_units * 40000.0).abs() < 1e-6);
        assert_eq!(form.index_rate_source(), IndexRateSource::Manual);
    }

    #[test]
    fn test_clamping_on_write() {
        let mut form = FormState::new();

        form.set_area(-20.0);
        assert_eq!(form.area_sqm(), 0.0);
        assert!(form.estimates().iter().all(|f| f.total_units == 0.0));

        form.set_index_rate(0.0);
        assert_eq!(form.index_rate(), 1.0);
        form.set_index_rate(-500.0);
        assert_eq!(form.index_rate(), 1.0);

        form.set_surcharge_percent(-10.0);
        assert_eq!(form.surcharge_percent(), 0.0);

        form.set_construction_unit_cost(Some(-3.0));
        assert_eq!(form.construction_unit_cost(), Some(0.0));
        assert_eq!(form.construction_reference(), None);
    }

    #[test]
    fn test_text_inputs() {
        let mut form = FormState::new();

        form.set_area_input("250.5");
        assert_eq!(form.area_sqm(), 250.5);
        form.set_area_input("");
        assert_eq!(form.area_sqm(), 0.0);
        form.set_area_input("abc");
        assert_eq!(form.area_sqm(), 0.0);

        form.set_index_rate_input("");
        assert_eq!(form.index_rate(), 1.0);
        form.set_index_rate_input(" 39500 ");
        assert_eq!(form.index_rate(), 39500.0);

        form.set_surcharge_input("15");
        assert_eq!(form.surcharge_percent(), 15.0);

        form.set_construction_unit_cost_input("600000");
        assert_eq!(form.construction_unit_cost(), Some(600_000.0));
        form.set_construction_unit_cost_input("");
        assert_eq!(form.construction_unit_cost(), None);
        form.set_construction_unit_cost_input("mucho");
        assert_eq!(form.construction_unit_cost(), None);
    }

    #[test]
    fn test_unknown_category_leaves_state_untouched() {
        let mut form = FormState::new();
        let before = *form.estimates();

        let err = form.set_category("Galpón").unwrap_err();
        assert_eq!(err, EstimatorError::UnknownCategory("Galpón".to_string()));
        assert_eq!(form.selected_category(), "Vivienda unifamiliar");
        assert_eq!(*form.estimates(), before);
    }

    #[test]
    fn test_construction_reference_scenarios() {
        let mut form = FormState::new();
        form.set_construction_unit_cost(Some(600_000.0));
        assert_eq!(form.construction_reference(), Some(60_000_000.0));

        form.set_construction_unit_cost(None);
        assert_eq!(form.construction_reference(), None);
    }

    #[test]
    fn test_construction_cost_never_changes_fees() {
        let mut form = FormState::new();
        form.set_surcharge_percent(12.0);
        let before = *form.estimates();

        for cost in [Some(600_000.0), Some(1.0), None, Some(0.0), Some(1e9)] {
            form.set_construction_unit_cost(cost);
            assert_eq!(*form.estimates(), before);
        }
    }

    #[test]
    fn test_construction_reference_ignores_category_and_surcharge() {
        let mut form = FormState::new();
        form.set_construction_unit_cost(Some(600_000.0));
        let reference = form.construction_reference();

        form.set_category("Interiorismo comercial alta gama (proyecto)").unwrap();
        assert_eq!(form.construction_reference(), reference);
        form.set_surcharge_percent(40.0);
        assert_eq!(form.construction_reference(), reference);
        form.set_index_rate(12345.0);
        assert_eq!(form.construction_reference(), reference);

        form.set_area(200.0);
        assert_eq!(form.construction_reference(), Some(120_000_000.0));
    }

    #[test]
    fn test_fetch_success_overwrites_rate() {
        let mut form = FormState::new();
        let quote = IndexRateQuote { value: 39600.0, as_of: None };

        assert_eq!(form.apply_fetch_result(Ok(quote)), Ok(39600.0));
        assert_eq!(form.index_rate(), 39600.0);
        assert!(matches!(form.index_rate_source(), IndexRateSource::Fetched { .. }));
        assert!((form.estimates().high.total_currency - 100.0 * 39600.0).abs() < 1e-6);
    }

    #[test]
    fn test_fetch_failure_keeps_manual_value() {
        let mut form = FormState::new();
        form.set_index_rate(38000.0);
        let before = *form.estimates();

        let err = form
            .apply_fetch_result(Err(FetchError::NonPositive(0.0)))
            .unwrap_err();
        assert_eq!(err, FetchError::NonPositive(0.0));
        assert_eq!(form.index_rate(), 38000.0);
        assert_eq!(form.index_rate_source(), IndexRateSource::Manual);
        assert_eq!(*form.estimates(), before);
    }

    #[test]
    fn test_last_fetch_to_complete_wins() {
        let mut form = FormState::new();
        let first = IndexRateQuote { value: 39000.0, as_of: None };
        let second = IndexRateQuote { value: 39100.0, as_of: None };

        form.apply_fetch_result(Ok(second)).unwrap();
        form.apply_fetch_result(Ok(first)).unwrap();
        assert_eq!(form.index_rate(), 39000.0);
    }

    #[test]
    fn test_category_cycling() {
        let mut form = FormState::new();
        form.next_category();
        assert_eq!(form.selected_category(), "Vivienda unifamiliar premium");
        form.previous_category();
        form.previous_category();
        assert_eq!(form.selected_category(), "Vivienda social estandarizada");
        assert!((form.estimates().low.total_units - 60.0).abs() < EPS);
    }

    #[test]
    fn test_display_lines() {
        let mut form = FormState::new();
        assert_eq!(form.rate_band_line(), "0.800 UF · 0.900 UF · 1.000 UF");
        assert_eq!(form.basis_line(Tier::Mid), "Base: 0.900 UF · m²: 100");

        form.set_surcharge_percent(20.0);
        assert_eq!(form.basis_line(Tier::Mid), "Base: 0.900 UF · m²: 100 · recargo: 20%");

        let snapshot = form.snapshot();
        assert_eq!(snapshot.display.cards.len(), 3);
        assert_eq!(snapshot.display.cards[0].label, "BAJO");
        assert_eq!(snapshot.display.cards[1].total_units, "108.000 UF");
        assert_eq!(snapshot.display.cards[1].total_currency, "$4.258.224");
        assert_eq!(snapshot.display.construction_reference, None);
    }

    #[test]
    fn test_from_config() {
        let config = EstimatorConfig {
            default_category: "Regularización (genérica)".to_string(),
            default_area_sqm: -1.0,
            default_index_rate: 0.5,
            ..EstimatorConfig::default()
        };
        let form = FormState::from_config(&config).unwrap();
        assert_eq!(form.selected_category(), "Regularización (genérica)");
        assert_eq!(form.area_sqm(), 0.0);
        assert_eq!(form.index_rate(), 1.0);

        let bad = EstimatorConfig {
            default_category: "Galpón".to_string(),
            ..EstimatorConfig::default()
        };
        assert!(FormState::from_config(&bad).is_err());
    }
}
