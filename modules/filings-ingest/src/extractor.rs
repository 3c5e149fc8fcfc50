// Fact extraction from XBRL-to-JSON output.
//
// The conversion service owns the shape of its output, so the document is
// treated as an untyped tree. Any key whose value is a list of records
// carrying a `value` field is taken to be a fact list for that key.

use std::collections::HashMap;
use std::sync::Arc;

use edgar_client::{EdgarClient, EdgarError};
use filings_common::{FilingError, RawFactMap, Result};
use tracing::{debug, info, warn};
use xbrl_client::XbrlClient;

/// Nesting below this depth is not scanned.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A node of the converted document.
#[derive(Debug, Clone, PartialEq)]
pub enum FactNode {
    Scalar(Scalar),
    Seq(Vec<FactNode>),
    Map(Vec<(String, FactNode)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<serde_json::Value> for FactNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FactNode::Scalar(Scalar::Null),
            Value::Bool(b) => FactNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_f64() {
                Some(f) => FactNode::Scalar(Scalar::Number(f)),
                None => FactNode::Scalar(Scalar::Text(n.to_string())),
            },
            Value::String(s) => FactNode::Scalar(Scalar::Text(s)),
            Value::Array(items) => FactNode::Seq(items.into_iter().map(FactNode::from).collect()),
            Value::Object(map) => {
                FactNode::Map(map.into_iter().map(|(k, v)| (k, FactNode::from(v))).collect())
            }
        }
    }
}

impl FactNode {
    fn field(&self, name: &str) -> Option<&FactNode> {
        match self {
            FactNode::Map(entries) => entries.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// A non-empty sequence whose first element is a record with a `value` field.
    fn is_fact_list(&self) -> bool {
        match self {
            FactNode::Seq(items) => items
                .first()
                .is_some_and(|first| first.field("value").is_some()),
            _ => false,
        }
    }
}

/// Fact lists discovered in a document, keyed by the key they were found under.
#[derive(Debug, Default)]
pub struct FactIndex {
    lists: HashMap<String, Vec<FactNode>>,
    /// Some branch was deeper than the scan limit.
    pub truncated: bool,
}

impl FactIndex {
    /// Walk `root` and collect fact lists. A key seen more than once keeps the
    /// list found last in document order.
    pub fn scan(root: &FactNode, max_depth: usize) -> Self {
        let mut index = FactIndex::default();
        index.collect(root, 0, max_depth);
        index
    }

    fn collect(&mut self, node: &FactNode, depth: usize, max_depth: usize) {
        if depth >= max_depth {
            if !matches!(node, FactNode::Scalar(_)) {
                self.truncated = true;
            }
            return;
        }
        match node {
            FactNode::Map(entries) => {
                for (key, child) in entries {
                    match child {
                        FactNode::Seq(items) if child.is_fact_list() => {
                            self.lists.insert(key.clone(), items.clone());
                        }
                        _ => self.collect(child, depth + 1, max_depth),
                    }
                }
            }
            FactNode::Seq(items) => {
                for item in items {
                    self.collect(item, depth + 1, max_depth);
                }
            }
            FactNode::Scalar(_) => {}
        }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Fact list for a tag, by full name first, then by local name.
    pub fn facts_for(&self, tag: &str) -> Option<&[FactNode]> {
        self.lists
            .get(tag)
            .or_else(|| self.lists.get(local_name(tag)))
            .map(Vec::as_slice)
    }

    /// Numeric `value` of the first record for `tag`.
    pub fn first_value(&self, tag: &str) -> Option<f64> {
        let first = self.facts_for(tag)?.first()?;
        coerce_number(first.field("value")?)
    }
}

/// `us-gaap:Revenues` -> `Revenues`. Tags without a prefix are returned whole.
pub fn local_name(tag: &str) -> &str {
    tag.split_once(':').map_or(tag, |(_, local)| local)
}

/// Missing, blank and unparseable values all come out as `None`.
///
/// Stricter than a plain float cast: booleans are not numbers, and NaN or
/// infinite values (including the strings "NaN" and "inf") cannot be stored
/// as metric values, so they count as unparseable too.
pub fn coerce_number(node: &FactNode) -> Option<f64> {
    let value = match node {
        FactNode::Scalar(Scalar::Number(n)) => *n,
        FactNode::Scalar(Scalar::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Look up every requested tag in a converted document.
pub fn extract_facts(document: &FactNode, tags: &[String], max_depth: usize) -> RawFactMap {
    let index = FactIndex::scan(document, max_depth);
    if index.truncated {
        warn!(max_depth, "Document nesting exceeded scan depth; deeper facts ignored");
    }
    debug!(fact_lists = index.len(), "Scanned converted document");

    tags.iter()
        .map(|tag| (tag.clone(), index.first_value(tag)))
        .collect()
}

/// EDGAR throttling stays distinct so the poller can cool down; any other
/// failure to find the document fails extraction.
fn resolve_error(err: EdgarError) -> FilingError {
    match err {
        EdgarError::RateLimited => FilingError::RateLimited,
        other => FilingError::Extraction(format!("resolving primary document: {other}")),
    }
}

/// Resolves a filing's primary document, converts it, and pulls out facts.
pub struct FactExtractor {
    edgar: Arc<EdgarClient>,
    xbrl: XbrlClient,
}

impl FactExtractor {
    pub fn new(edgar: Arc<EdgarClient>, xbrl: XbrlClient) -> Self {
        Self { edgar, xbrl }
    }

    pub async fn extract(&self, cik: &str, accession: &str, tags: &[String]) -> Result<RawFactMap> {
        let url = self
            .edgar
            .primary_document_url(cik, accession)
            .await
            .map_err(resolve_error)?;

        let converted = self
            .xbrl
            .xbrl_to_json(&url)
            .await
            .map_err(|e| FilingError::Extraction(format!("converting {url}: {e}")))?;

        let facts = extract_facts(&FactNode::from(converted), tags, DEFAULT_MAX_DEPTH);
        info!(
            accession,
            requested = tags.len(),
            found = facts.values().filter(|v| v.is_some()).count(),
            "Extracted facts"
        );
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn doc(value: serde_json::Value) -> FactNode {
        FactNode::from(value)
    }

    #[test]
    fn finds_nested_fact_lists() {
        let document = doc(json!({
            "StatementsOfIncome": {
                "Revenues": [
                    { "period": { "startDate": "2024-01-01" }, "value": "391035000000" },
                    { "value": "383285000000" }
                ]
            },
            "BalanceSheets": [
                { "Assets": [ { "value": 364980000000.0 } ] }
            ]
        }));

        let facts = extract_facts(
            &document,
            &tags(&["us-gaap:Revenues", "us-gaap:Assets"]),
            DEFAULT_MAX_DEPTH,
        );

        assert_eq!(facts["us-gaap:Revenues"], Some(391035000000.0));
        assert_eq!(facts["us-gaap:Assets"], Some(364980000000.0));
    }

    #[test]
    fn full_tag_wins_over_local_name() {
        let document = doc(json!({
            "us-gaap:NetIncomeLoss": [ { "value": 1 } ],
            "NetIncomeLoss": [ { "value": 2 } ]
        }));

        let facts = extract_facts(&document, &tags(&["us-gaap:NetIncomeLoss"]), 8);
        assert_eq!(facts["us-gaap:NetIncomeLoss"], Some(1.0));
    }

    #[test]
    fn empty_fact_list_yields_none() {
        let document = doc(json!({ "BalanceSheets": { "Liabilities": [] } }));

        let facts = extract_facts(&document, &tags(&["us-gaap:Liabilities"]), 8);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["us-gaap:Liabilities"], None);
    }

    #[test]
    fn missing_tag_yields_none() {
        let facts = extract_facts(&doc(json!({})), &tags(&["us-gaap:GrossProfit"]), 8);
        assert_eq!(facts["us-gaap:GrossProfit"], None);
    }

    #[test]
    fn unparseable_values_yield_none() {
        let document = doc(json!({
            "A": [ { "value": "" } ],
            "B": [ { "value": "n/a" } ],
            "C": [ { "value": null } ],
            "D": [ { "value": true } ],
            "E": [ { "value": { "nested": 1 } } ],
            "F": [ { "value": " -12.5 " } ]
        }));

        let facts = extract_facts(&document, &tags(&["x:A", "x:B", "x:C", "x:D", "x:E", "x:F"]), 8);
        assert_eq!(facts["x:A"], None);
        assert_eq!(facts["x:B"], None);
        assert_eq!(facts["x:C"], None);
        assert_eq!(facts["x:D"], None);
        assert_eq!(facts["x:E"], None);
        assert_eq!(facts["x:F"], Some(-12.5));
    }

    #[test]
    fn non_finite_values_yield_none() {
        let document = doc(json!({
            "A": [ { "value": "NaN" } ],
            "B": [ { "value": "inf" } ],
            "C": [ { "value": "-Infinity" } ],
            "D": [ { "value": false } ],
            "E": [ { "value": "1e3" } ]
        }));

        let facts = extract_facts(&document, &tags(&["x:A", "x:B", "x:C", "x:D", "x:E"]), 8);
        assert_eq!(facts["x:A"], None);
        assert_eq!(facts["x:B"], None);
        assert_eq!(facts["x:C"], None);
        assert_eq!(facts["x:D"], None);
        assert_eq!(facts["x:E"], Some(1000.0));
    }

    #[test]
    fn throttled_lookup_stays_rate_limited() {
        assert!(matches!(
            resolve_error(EdgarError::RateLimited),
            FilingError::RateLimited
        ));
        let other = resolve_error(EdgarError::NoDocumentFound {
            accession: "0000320193-24-000123".to_string(),
        });
        match other {
            FilingError::Extraction(message) => {
                assert!(message.starts_with("resolving primary document"))
            }
            e => panic!("expected Extraction, got {e:?}"),
        }
    }

    #[test]
    fn records_without_value_are_not_fact_lists() {
        let document = doc(json!({
            "Revenues": [ { "label": "Revenue" } ],
            "Nested": { "Revenues": [ { "value": 7 } ] }
        }));

        let facts = extract_facts(&document, &tags(&["us-gaap:Revenues"]), 8);
        assert_eq!(facts["us-gaap:Revenues"], Some(7.0));
    }

    #[test]
    fn first_record_only() {
        let document = doc(json!({ "Assets": [ { "value": "abc" }, { "value": 10 } ] }));

        let facts = extract_facts(&document, &tags(&["us-gaap:Assets"]), 8);
        assert_eq!(facts["us-gaap:Assets"], None);
    }

    #[test]
    fn depth_limit_stops_scan() {
        let document = doc(json!({ "a": { "b": { "c": { "Assets": [ { "value": 1 } ] } } } }));

        let shallow = FactIndex::scan(&document, 2);
        assert!(shallow.truncated);
        assert_eq!(shallow.first_value("Assets"), None);

        let deep = FactIndex::scan(&document, 8);
        assert!(!deep.truncated);
        assert_eq!(deep.first_value("Assets"), Some(1.0));
    }

    #[test]
    fn local_name_splits_on_first_colon() {
        assert_eq!(local_name("us-gaap:Revenues"), "Revenues");
        assert_eq!(local_name("Revenues"), "Revenues");
        assert_eq!(local_name("a:b:c"), "b:c");
    }
}
