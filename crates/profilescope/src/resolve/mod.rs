//! Candidate validation, scoring and slug resolution.

pub mod audience;
pub mod resolver;
pub mod scoring;
pub mod validate;

pub use resolver::{Resolution, ResolutionMethod, SlugResolver};
pub use scoring::CandidateScorer;
pub use validate::{AudienceProbe, BrowserProbe, CandidateValidator, HttpProbe, Selection, Validation};
