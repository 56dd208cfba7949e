//! zotkeeper recon — duplicate detection, merge planning, multi-source
//! enrichment and quality control for a remote reference library.

pub mod dedup;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod identifiers;
pub mod merge;
pub mod normalize;
pub mod quality;
pub mod similarity;
pub mod sources;
pub mod tagging;

pub use dedup::{DuplicateFinder, DuplicateGroup};
pub use enrichment::{
    EnrichStatus, Enricher, EnrichmentOutcome, EnrichmentStats, default_target_fields,
};
pub use error::{ReconError, Result};
pub use identifiers::{Doi, doi_from_record};
pub use merge::{MergeOptions, MergeOutcome, MergeStrategy, build_strategy, execute_merge};
pub use quality::{AuditReport, Finding, NormalizeStats, QualityAuditor};
pub use similarity::{SimilarityScore, SimilarityWeights, score};
pub use sources::{
    CrossRefSource, MetadataSource, OpenAlexSource, RawMetadata, SemanticScholarSource,
};
pub use tagging::{AutoTagger, KeywordMap, TagStats, default_keyword_map};
