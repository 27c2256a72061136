//! Semblanza Resolution Layer
//!
//! Turns detector candidates into resolved attributes: assignment of
//! unowned candidates to the nearest mention, conflict classification per
//! (entity, attribute type), a principled resolution engine with batched
//! LLM arbitration for true conflicts, and a final deduplication pass.
//!
//! The entry point is [`AttributeResolver`]:
//!
//! ```no_run
//! use semblanza_domain::DocumentBuilder;
//! use semblanza_resolve::{AttributeResolver, ResolverConfig};
//!
//! # async fn run() {
//! let resolver = AttributeResolver::new(ResolverConfig::default()).unwrap();
//! let document = DocumentBuilder::new("María tenía los ojos azules.")
//!     .entity("María")
//!     .build();
//! let outcome = resolver.resolve(&document).await;
//! for attribute in &outcome.attributes {
//!     println!(
//!         "{}: {} = {} ({:.2})",
//!         attribute.entity_name,
//!         attribute.attribute_type,
//!         attribute.value,
//!         attribute.final_confidence,
//!     );
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod arbiter;
pub mod assign;
pub mod classify;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod pipeline;
pub mod resolution;

pub use config::{MethodPrecision, MethodWeights, ResolverConfig};
pub use error::ResolveError;
pub use pipeline::{AttributeResolver, DisabledArbiter, PipelineOutcome, RunMetadata};
