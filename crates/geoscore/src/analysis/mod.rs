//! The aggregation-and-caching core: normalization, weighting, scoring, the
//! TTL result cache, in-flight deduplication, and the aggregator that
//! orchestrates them per country.

pub mod aggregator;
pub mod cache;
pub mod domain;
pub mod inflight;
pub mod normalize;
pub mod router;
pub mod score;
pub mod weights;

pub use aggregator::Aggregator;
pub use cache::ResultCache;
pub use domain::{
    request_key, AnalysisOutcome, AnalysisReport, DebugBreakdown, Metric, NormalizedMetrics,
    RawMetrics, RiskTolerance, StayDuration, SubScores, WeightMapping,
};
pub use inflight::{Flight, InFlightRegistry};
pub use router::{
    analyze_router, format_ranked_line, run_analysis, validate_countries, AnalyzeMetadata,
    AnalyzeRequest, AnalyzeResponse, RankedResult,
};
