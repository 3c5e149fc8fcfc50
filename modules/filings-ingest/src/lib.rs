pub mod extractor;
pub mod normalizer;
pub mod poller;
pub mod seen;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use extractor::FactExtractor;
pub use normalizer::{normalize, AliasTable};
pub use poller::{PollStats, Poller, PollerConfig, PollerDeps, Stage, TickOutcome};
pub use seen::{InMemorySeenSet, SeenSet};
pub use store::PgFilingStore;
pub use traits::{DocumentArchiver, FactSource, FilingIndex, FilingStore};
