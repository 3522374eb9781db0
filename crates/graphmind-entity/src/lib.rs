//! graphmind-entity - Entity resolution and deduplication for graphmind.
//!
//! - [`similarity`]: character and hybrid token similarity over names.
//! - [`resolver`]: maps textual references to canonical directory entries,
//!   degrading to the literal text when anything goes wrong.
//! - [`merge`]: finds likely duplicates and merges them without losing
//!   relationships.

pub mod merge;
pub mod resolver;
pub mod similarity;

pub use merge::{absorb_record, rank_candidates, EntityMergeEngine, MergePlan, MergeReport};
pub use resolver::{best_fuzzy_match, EntityResolver, FuzzyMatch};
pub use similarity::{calculate_similarity, levenshtein_similarity, normalize_name, token_similarity};
