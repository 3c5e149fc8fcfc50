use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested tag -> extracted value. Scoped to one extraction call.
pub type RawFactMap = HashMap<String, Option<f64>>;

/// A filing as recorded in the `filings` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filing {
    pub cik: String,
    pub accession: String,
    pub form: String,
    pub sha256: String,
}

/// Normalized financial concepts. Every filing gets a value slot for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalMetric {
    Revenue,
    GrossProfit,
    OperatingIncome,
    NetIncome,
    OperatingCashFlow,
    Capex,
    TotalAssets,
    TotalLiabilities,
    StockholdersEquity,
}

const METRIC_COUNT: usize = 9;

impl CanonicalMetric {
    pub const ALL: [CanonicalMetric; METRIC_COUNT] = [
        Self::Revenue,
        Self::GrossProfit,
        Self::OperatingIncome,
        Self::NetIncome,
        Self::OperatingCashFlow,
        Self::Capex,
        Self::TotalAssets,
        Self::TotalLiabilities,
        Self::StockholdersEquity,
    ];

    /// Column name in `filing_metrics` and `metric_name` in `metric_points`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::GrossProfit => "gross_profit",
            Self::OperatingIncome => "operating_income",
            Self::NetIncome => "net_income",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::Capex => "capex",
            Self::TotalAssets => "total_assets",
            Self::TotalLiabilities => "total_liabilities",
            Self::StockholdersEquity => "stockholders_equity",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric: {s}"))
    }
}

/// Value of every canonical metric for one filing.
///
/// Backed by a fixed array indexed by `CanonicalMetric`, so a metric can be
/// null but never missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSet {
    values: [Option<f64>; METRIC_COUNT],
}

impl MetricSet {
    pub fn get(&self, metric: CanonicalMetric) -> Option<f64> {
        self.values[metric.index()]
    }

    pub fn set(&mut self, metric: CanonicalMetric, value: Option<f64>) {
        self.values[metric.index()] = value;
    }

    pub fn with(mut self, metric: CanonicalMetric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    /// All metrics in vocabulary order, including nulls.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalMetric, Option<f64>)> + '_ {
        CanonicalMetric::ALL.into_iter().map(|m| (m, self.get(m)))
    }

    /// Only the metrics that carry a value.
    pub fn present(&self) -> impl Iterator<Item = (CanonicalMetric, f64)> + '_ {
        self.iter().filter_map(|(m, v)| v.map(|v| (m, v)))
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}
