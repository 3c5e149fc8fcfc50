// Alias-priority mapping from raw XBRL tags onto the canonical metric vocabulary.

use std::collections::{BTreeMap, HashSet};

use filings_common::{CanonicalMetric, MetricSet, RawFactMap};

/// Ordered raw-tag aliases for each canonical metric, most preferred first.
///
/// Filers switch reporting tags between periods (e.g. `Revenues` vs.
/// `RevenueFromContractWithCustomerExcludingAssessedTax` after ASC 606), so
/// each metric accepts several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<CanonicalMetric, Vec<String>>,
}

impl AliasTable {
    /// A table with no aliases. Every metric normalizes to null until aliases are added.
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Append aliases for `metric`, after any already registered.
    pub fn with(mut self, metric: CanonicalMetric, tags: &[&str]) -> Self {
        self.aliases
            .entry(metric)
            .or_default()
            .extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn aliases(&self, metric: CanonicalMetric) -> &[String] {
        self.aliases.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every alias in the table, deduplicated, in metric then priority order.
    pub fn requested_tags(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        CanonicalMetric::ALL
            .into_iter()
            .flat_map(|m| self.aliases(m).iter())
            .filter(|tag| seen.insert(tag.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        use CanonicalMetric::*;
        Self::empty()
            .with(
                Revenue,
                &[
                    "us-gaap:Revenues",
                    "us-gaap:RevenueFromContractWithCustomerExcludingAssessedTax",
                    "us-gaap:SalesRevenueNet",
                    "us-gaap:RevenueFromContractWithCustomerIncludingAssessedTax",
                ],
            )
            .with(GrossProfit, &["us-gaap:GrossProfit"])
            .with(OperatingIncome, &["us-gaap:OperatingIncomeLoss"])
            .with(
                NetIncome,
                &[
                    "us-gaap:NetIncomeLoss",
                    "us-gaap:ProfitLoss",
                    "us-gaap:NetIncomeLossAvailableToCommonStockholdersBasic",
                ],
            )
            .with(
                OperatingCashFlow,
                &[
                    "us-gaap:NetCashProvidedByUsedInOperatingActivities",
                    "us-gaap:NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
                ],
            )
            .with(
                Capex,
                &[
                    "us-gaap:PaymentsToAcquirePropertyPlantAndEquipment",
                    "us-gaap:PaymentsToAcquireProductiveAssets",
                ],
            )
            .with(TotalAssets, &["us-gaap:Assets"])
            .with(TotalLiabilities, &["us-gaap:Liabilities"])
            .with(
                StockholdersEquity,
                &[
                    "us-gaap:StockholdersEquity",
                    "us-gaap:StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
                ],
            )
    }
}

/// For each canonical metric, take the value of the first alias present in
/// `raw` with a non-null value.
pub fn normalize(raw: &RawFactMap, table: &AliasTable) -> MetricSet {
    let mut metrics = MetricSet::default();
    for metric in CanonicalMetric::ALL {
        let value = table
            .aliases(metric)
            .iter()
            .find_map(|tag| raw.get(tag).copied().flatten());
        metrics.set(metric, value);
    }
    metrics
}
