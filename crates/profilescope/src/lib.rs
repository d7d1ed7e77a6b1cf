// Copyright 2026 Profilescope Contributors
// SPDX-License-Identifier: Apache-2.0

//! Profilescope: resolve a company name to its public profile and acquire
//! the profile's text through layered fallbacks.
//!
//! The entry point is [`AcquisitionOrchestrator::acquire_profile`]. Share one
//! [`RateLimiter`] across every orchestrator in the process.

#![allow(clippy::new_without_default)]

pub mod audit;
pub mod config;
pub mod crawl;
pub mod error;
pub mod events;
pub mod extract;
pub mod http;
pub mod names;
pub mod orchestrator;
pub mod rate_limit;
pub mod resolve;
pub mod search;
pub mod session;
pub mod summarize;
pub mod types;

pub use config::IntelConfig;
pub use crawl::{CrawlApi, CrawlBlock, CrawlFallback};
pub use error::{IntelError, IntelResult};
pub use extract::ContentExtractor;
pub use orchestrator::AcquisitionOrchestrator;
pub use rate_limit::{RateLimitSnapshot, RateLimitStatus, RateLimiter};
pub use resolve::{Resolution, ResolutionMethod, SlugResolver};
pub use search::{CandidateSearchEngine, SearchApi, SearchHit};
pub use session::{BrowserSession, NavigationResult, SessionFactory};
pub use summarize::{prepare_summary_input, SummarizationService};
pub use types::*;
