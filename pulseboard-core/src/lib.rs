//! # pulseboard-core
//!
//! Response-analytics core for pulseboard, a survey-building and
//! response-collection application.
//!
//! This library provides:
//! - Domain types for survey schemas, responses, and answers
//! - A batch analyzer deriving a full [`report::ResponseAnalysis`] from a
//!   response snapshot
//! - A live aggregator maintaining window-bounded [`live::RealTimeMetrics`]
//!   as change-feed events arrive
//! - Shared statistics helpers, configuration, and logging infrastructure
//!
//! ## Architecture
//!
//! The surrounding application owns storage, auth, transport, and
//! rendering. This crate only transforms data:
//! - **Batch:** schema + response snapshot in, [`report::ResponseAnalysis`]
//!   out. Pure, synchronous, never errors.
//! - **Live:** the app feeds [`live::ChangeEvent`]s into
//!   [`live::LiveAnalytics`], which re-queries a bounded recent window
//!   through [`live::ResponseSource`] and pushes snapshots to subscribers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulseboard_core::{AnalyzerConfig, ResponseAnalyzer};
//!
//! let analyzer = ResponseAnalyzer::new(AnalyzerConfig::default());
//! # let schema: pulseboard_core::SurveySchema = todo!();
//! # let responses: Vec<pulseboard_core::ResponseRecord> = todo!();
//! let analysis = analyzer.analyze(&schema, &responses);
//! println!("{:.1}% completion", analysis.completion_rate);
//! ```

// Re-export commonly used items at the crate root
pub use config::{AnalyzerConfig, Config, RealtimeConfig};
pub use device::{DeviceClassifier, KeywordClassifier};
pub use error::{Error, Result};
pub use live::{AnalyticsUpdate, LiveAnalytics, RealTimeMetrics};
pub use report::{ResponseAnalysis, ResponseAnalyzer};
pub use types::*;

// Public modules
pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod live;
pub mod logging;
pub mod report;
pub mod stats;
pub mod types;
