// Accessions already dispatched during this process lifetime.
//
// Not durable. Reprocessing after a restart is safe because every write in
// the store is an upsert.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub trait SeenSet: Send + Sync {
    fn contains(&self, accession: &str) -> bool;

    /// Mark an accession as dispatched. Returns false if it already was.
    fn insert(&self, accession: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemorySeenSet {
    accessions: Mutex<HashSet<String>>,
}

impl InMemorySeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn SeenSet> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave a HashSet half-updated.
        self.accessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SeenSet for InMemorySeenSet {
    fn contains(&self, accession: &str) -> bool {
        self.lock().contains(accession)
    }

    fn insert(&self, accession: &str) -> bool {
        self.lock().insert(accession.to_string())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_first_sighting() {
        let seen = InMemorySeenSet::new();
        assert!(seen.is_empty());
        assert!(seen.insert("0001-A"));
        assert!(!seen.insert("0001-A"));
        assert!(seen.contains("0001-A"));
        assert!(!seen.contains("0001-B"));
        assert_eq!(seen.len(), 1);
    }
}
