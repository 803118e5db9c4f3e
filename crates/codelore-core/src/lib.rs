//! Question routing and retrieval orchestration.
//!
//! A question is classified into a route (exact symbol lookup, semantic
//! search, or none), the matching retrieval path runs, and the question is
//! returned augmented with bounded context. Retrieval is advisory: every
//! failure degrades to passing the question through unchanged.

pub mod config;
pub mod locator;
pub mod orchestrator;
pub mod outline;
pub mod router;

pub use config::Config;
pub use locator::Occurrence;
pub use orchestrator::Orchestrator;
pub use router::Route;
