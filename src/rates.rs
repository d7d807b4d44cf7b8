// 📐 Rate Table - UF per m² by project category
// Business-agreed pricing policy for project fees (not construction costs).
// The table is static data: no API mutates it at runtime.

use crate::error::{EstimatorError, EstimatorResult};
use serde::Serialize;

// ============================================================================
// TIER
// ============================================================================

/// One of the three fee levels offered for every category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    /// All tiers, cheapest first
    pub const ALL: [Tier; 3] = [Tier::Low, Tier::Mid, Tier::High];

    /// Label printed on the fee card
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Low => "BAJO",
            Tier::Mid => "MEDIO",
            Tier::High => "ALTO",
        }
    }
}

// ============================================================================
// RATE TRIPLE
// ============================================================================

/// Per-area unit rates (UF/m²) for the three tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateTriple {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl RateTriple {
    pub const fn new(low: f64, mid: f64, high: f64) -> Self {
        RateTriple { low, mid, high }
    }

    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Low => self.low,
            Tier::Mid => self.mid,
            Tier::High => self.high,
        }
    }

    /// low ≤ mid ≤ high
    pub fn is_non_decreasing(&self) -> bool {
        self.low <= self.mid && self.mid <= self.high
    }
}

// ============================================================================
// CATEGORY RATE
// ============================================================================

/// One project category and its rate triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryRate {
    pub name: &'static str,
    pub rates: RateTriple,
}

const fn row(name: &'static str, low: f64, mid: f64, high: f64) -> CategoryRate {
    CategoryRate {
        name,
        rates: RateTriple::new(low, mid, high),
    }
}

/// Category used when nothing else is configured
pub const DEFAULT_CATEGORY: &str = "Vivienda unifamiliar";

static CATEGORY_RATES: [CategoryRate; 13] = [
    // Housing
    row("Vivienda de interés social", 0.35, 0.40, 0.45),
    row("Vivienda económica", 0.45, 0.525, 0.60),
    row("Vivienda social estandarizada", 0.60, 0.675, 0.75),
    row("Vivienda unifamiliar", 0.80, 0.90, 1.00),
    row("Vivienda unifamiliar premium", 1.10, 1.25, 1.40),
    row("Viviendas turísticas / Refugios / Hostales", 1.00, 1.30, 1.60),
    // Interior design (project only, no furniture or materials)
    row("Interiorismo residencial (proyecto)", 0.50, 1.00, 1.50),
    row("Interiorismo comercial básico (proyecto)", 0.50, 1.00, 1.00),
    row("Interiorismo comercial alta gama (proyecto)", 1.00, 1.50, 2.00),
    // Permits
    row("Regularización (genérica)", 0.33, 0.39, 0.45),
    row("Recepción Final – Estándar (proyecto propio)", 0.10, 0.125, 0.15),
    row("Recepción Final – Compleja", 0.15, 0.175, 0.20),
    row("Recepción Final – Encargo aislado (+recargo)", 0.18, 0.22, 0.26),
];

// ============================================================================
// RATE TABLE
// ============================================================================

/// Read-only view over the category → rates table, in display order
#[derive(Debug, Clone, Copy)]
pub struct RateTable {
    rows: &'static [CategoryRate],
}

impl RateTable {
    /// The built-in pricing table
    pub fn builtin() -> Self {
        RateTable {
            rows: &CATEGORY_RATES,
        }
    }

    /// Rates for a category; fails only for names outside the table
    pub fn lookup(&self, name: &str) -> EstimatorResult<RateTriple> {
        self.get(name)
            .map(|row| row.rates)
            .ok_or_else(|| EstimatorError::UnknownCategory(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&'static CategoryRate> {
        self.rows.iter().find(|row| row.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn rows(&self) -> &'static [CategoryRate] {
        self.rows
    }

    pub fn categories(&self) -> impl Iterator<Item = &'static str> {
        self.rows.iter().map(|row| row.name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.name == name)
    }

    /// Category after `name`, wrapping around (used by the selector)
    pub fn next_category(&self, name: &str) -> &'static str {
        let i = match self.position(name) {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.rows[i].name
    }

    /// Category before `name`, wrapping around
    pub fn previous_category(&self, name: &str) -> &'static str {
        let i = match self.position(name) {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.rows[i].name
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// TESTS
// ============================================================================
