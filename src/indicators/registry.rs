use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

use crate::analysis::normalize::{Calibration, Direction};
use crate::error::RiskError;
use crate::indicators::liquidity_spreads::CommercialPaperSpread;
use crate::indicators::yield_curve::YieldCurve10Y2Y;
use crate::indicators::CalculatedIndicator;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Volatility,
    #[serde(rename = "Credit/Stress")]
    CreditStress,
    Valuation,
    Liquidity,
    Macro,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Volatility => "Volatility",
            Category::CreditStress => "Credit/Stress",
            Category::Valuation => "Valuation",
            Category::Liquidity => "Liquidity",
            Category::Macro => "Macro",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceType {
    Fred,
    Yahoo,
    Multpl,      // multpl.com monthly tables
    PutCallPage, // scraped options statistics page
    Calculated,
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Fred => "FRED",
            SourceType::Yahoo => "Yahoo",
            SourceType::Multpl => "multpl",
            SourceType::PutCallPage => "PutCall",
            SourceType::Calculated => "Calculated",
        }
    }
}

/// A concrete place to read one indicator from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub source: SourceType,
    pub symbol: &'static str,
}

// ============================================================================
// SPEC & DEFINITION
// ============================================================================

/// Static description of a tracked metric, as handed to the scoring core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSpec {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub unit: String,
    #[serde(flatten)]
    pub calibration: Calibration,
    pub weight: f64,
    pub description: String,
    pub explanation: String,
}

/// Registry entry: the scoring constants plus where to fetch the value and what
/// to use when every source fails.
#[derive(Debug, Clone)]
pub struct IndicatorDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub unit: &'static str,
    pub direction: Direction,
    pub min: f64,
    pub max: f64,
    pub weight: f64,
    pub description: &'static str,
    pub explanation: &'static str,
    pub primary: SourceRef,
    pub secondary: Option<SourceRef>,
    /// Label the grounded-search response uses for this value.
    pub search_label: &'static str,
    pub fallback: f64,
}

impl IndicatorDefinition {
    pub fn spec(&self) -> Result<IndicatorSpec, RiskError> {
        Ok(IndicatorSpec {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category,
            unit: self.unit.to_string(),
            calibration: Calibration::new(self.id, self.min, self.max, self.direction)?,
            weight: self.weight,
            description: self.description.to_string(),
            explanation: self.explanation.to_string(),
        })
    }

    /// Primary then secondary source, in the order they should be tried.
    pub fn sources(&self) -> Vec<SourceRef> {
        std::iter::once(self.primary).chain(self.secondary).collect()
    }
}

const fn src(source: SourceType, symbol: &'static str) -> SourceRef {
    SourceRef { source, symbol }
}

// ============================================================================
// STATIC INDICATOR REGISTRY (Lazy initialization, O(1) lookup)
// ============================================================================

static INDICATORS: Lazy<Vec<IndicatorDefinition>> = Lazy::new(|| {
    vec![
        IndicatorDefinition {
            id: "vix",
            name: "VIX (Fear Index)",
            category: Category::Volatility,
            unit: "",
            direction: Direction::HigherIsRisky,
            min: 10.0,
            max: 35.0,
            weight: 0.25,
            description: "CBOE Volatility Index tracking S&P 500 options implied volatility.",
            explanation: "High VIX indicates market expectation of large price swings and investor fear.",
            primary: src(SourceType::Yahoo, "^VIX"),
            secondary: Some(src(SourceType::Fred, "VIXCLS")),
            search_label: "VIX",
            fallback: 16.2,
        },
        IndicatorDefinition {
            id: "yield-curve",
            name: "10Y-2Y Yield Spread",
            category: Category::Macro,
            unit: "%",
            direction: Direction::LowerIsRisky,
            min: -0.5,
            max: 2.0,
            weight: 0.15,
            description: "The difference between 10-year and 2-year Treasury yields.",
            explanation: "Inversion (negative spread) historically precedes economic recessions.",
            primary: src(SourceType::Fred, "T10Y2Y"),
            secondary: Some(src(SourceType::Calculated, "yield_curve_10y_2y")),
            search_label: "T10Y2Y",
            fallback: 0.2,
        },
        IndicatorDefinition {
            id: "hy-spread",
            name: "High Yield OAS",
            category: Category::CreditStress,
            unit: "%",
            direction: Direction::HigherIsRisky,
            min: 2.5,
            max: 6.0,
            weight: 0.20,
            description: "Risk premium demanded for holding low-rated corporate debt.",
            explanation: "Widening spreads indicate rising credit risk and tightening financial conditions.",
            primary: src(SourceType::Fred, "BAMLH0A0HYM2"),
            secondary: None,
            search_label: "HY_OAS",
            fallback: 3.5,
        },
        IndicatorDefinition {
            id: "pe-ratio",
            name: "S&P 500 P/E Ratio",
            category: Category::Valuation,
            unit: "x",
            direction: Direction::HigherIsRisky,
            min: 15.0,
            max: 25.0,
            weight: 0.20,
            description: "Current price divided by trailing 12-month earnings.",
            explanation: "High valuation ratios relative to historical averages suggest a stretched market.",
            primary: src(SourceType::Multpl, "s-p-500-pe-ratio"),
            secondary: None,
            search_label: "PE_RATIO",
            fallback: 20.8,
        },
        IndicatorDefinition {
            id: "put-call",
            name: "Put/Call Ratio",
            category: Category::Volatility,
            unit: "",
            direction: Direction::HigherIsRisky,
            min: 0.5,
            max: 1.2,
            weight: 0.10,
            description: "Ratio of trading volume of put options to call options.",
            explanation: "An extremely high ratio suggests panic, while extremely low suggests complacency.",
            primary: src(SourceType::PutCallPage, "EQUITY PUT/CALL RATIO"),
            secondary: None,
            search_label: "PUT_CALL",
            fallback: 0.9,
        },
        IndicatorDefinition {
            id: "ted-spread",
            name: "TED Spread",
            category: Category::Liquidity,
            unit: "%",
            direction: Direction::HigherIsRisky,
            min: 0.1,
            max: 1.0,
            weight: 0.10,
            description: "Difference between interbank lending rates and short-term US Treasury bills.",
            explanation: "Increases in the TED spread signal a decrease in liquidity and higher counterparty risk.",
            primary: src(SourceType::Fred, "TEDRATE"),
            // TEDRATE stopped updating in 2022; the CP-bill spread tracks the same stress
            secondary: Some(src(SourceType::Calculated, "cp_bill_spread")),
            search_label: "TED",
            fallback: 0.25,
        },
    ]
});

static INDICATOR_MAP: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    INDICATORS
        .iter()
        .enumerate()
        .map(|(idx, ind)| (ind.id, idx))
        .collect()
});

// ============================================================================
// CATALOG
// ============================================================================

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Validated, ordered indicator set the aggregator scores against.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    specs: Vec<IndicatorSpec>,
}

impl Catalog {
    pub fn new(specs: Vec<IndicatorSpec>) -> Result<Self, RiskError> {
        if specs.is_empty() {
            return Err(RiskError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.id.as_str()) {
                return Err(RiskError::DuplicateIndicator(spec.id.clone()));
            }
            if !spec.weight.is_finite() || spec.weight.is_sign_negative() {
                return Err(RiskError::InvalidWeight { id: spec.id.clone(), weight: spec.weight });
            }
        }

        let catalog = Self { specs };
        let sum = catalog.weight_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            // Not fatal: the total is just proportionally off
            warn!("Indicator weights sum to {:.4}, not 1.0; total score will be scaled", sum);
        }
        Ok(catalog)
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&IndicatorSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    pub fn weight_sum(&self) -> f64 {
        self.specs.iter().map(|s| s.weight).sum()
    }
}

// ============================================================================
// REGISTRY STRUCT & IMPL
// ============================================================================

pub struct Registry;

impl Registry {
    /// All definitions, in scoring order.
    pub fn get_all_indicators() -> &'static [IndicatorDefinition] {
        &INDICATORS
    }

    /// O(1) lookup by id
    pub fn get_definition(id: &str) -> Option<&'static IndicatorDefinition> {
        INDICATOR_MAP.get(id).and_then(|&idx| INDICATORS.get(idx))
    }

    /// The standard six-indicator catalog.
    pub fn catalog() -> Result<Catalog, RiskError> {
        let specs = INDICATORS
            .iter()
            .map(IndicatorDefinition::spec)
            .collect::<Result<Vec<_>, _>>()?;
        Catalog::new(specs)
    }

    /// Get calculator for computed secondary sources
    pub fn get_calculator(slug: &str) -> Option<Box<dyn CalculatedIndicator + Send + Sync>> {
        match slug {
            "yield_curve_10y_2y" => Some(Box::new(YieldCurve10Y2Y)),
            "cp_bill_spread" => Some(Box::new(CommercialPaperSpread)),
            _ => None,
        }
    }
}
