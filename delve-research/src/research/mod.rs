//! Research pipeline
//!
//! - [`planner`]: question to search queries and subtopics
//! - [`aggregator`]: search and fetch every query into one session corpus
//! - [`synthesizer`]: budgeted corpus to one report
//! - [`engine`]: the façade the binaries talk to

pub mod aggregator;
pub mod corpus;
pub mod engine;
pub mod planner;
pub mod synthesizer;
pub mod templates;
pub mod types;

pub use aggregator::{ResearchAggregator, ResearchSession};
pub use corpus::{CorpusBlock, CorpusBuilder};
pub use engine::ResearchEngine;
pub use planner::QueryPlanner;
pub use synthesizer::{cap_corpus, ReportSynthesizer, CORPUS_TRUNCATION_MARKER};
pub use templates::*;
pub use types::*;
