use serde::Deserialize;

/// Response of `GET /submissions/CIK##########.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Submissions {
    pub filings: SubmissionFilings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionFilings {
    pub recent: RecentFilings,
}

/// Column-oriented listing of recent filings, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    #[serde(default)]
    pub accession_number: Vec<String>,
    #[serde(default)]
    pub form: Vec<String>,
}

/// One (accession, form) pair from the submissions index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingEntry {
    pub accession: String,
    pub form: String,
}

impl FilingEntry {
    pub fn new(accession: impl Into<String>, form: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            form: form.into(),
        }
    }
}

impl Submissions {
    /// Zip the parallel arrays into entries, preserving upstream order.
    /// Trailing entries without a partner in the other array are dropped.
    pub fn entries(&self) -> Vec<FilingEntry> {
        let recent = &self.filings.recent;
        recent
            .accession_number
            .iter()
            .zip(recent.form.iter())
            .map(|(accession, form)| FilingEntry::new(accession.clone(), form.clone()))
            .collect()
    }
}

/// Response of a filing folder's `index.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub directory: ManifestDirectory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestDirectory {
    #[serde(default)]
    pub item: Vec<ManifestItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    pub name: String,
}

impl Manifest {
    /// First file whose extension is `.htm` or `.html`, in manifest order.
    pub fn primary_document(&self) -> Option<&str> {
        self.directory
            .item
            .iter()
            .map(|item| item.name.as_str())
            .find(|name| is_html_name(name))
    }
}

fn is_html_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".htm") || lower.ends_with(".html")
}
