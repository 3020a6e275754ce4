//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod error;
pub mod expense;
pub mod log;
pub mod mirror;
pub mod pipeline;
pub mod price;
pub mod rate;
pub mod resolver;

// Re-export main types for cleaner imports
pub use currency::{ConvertedAmount, Currency, CurrencyConverter};
pub use error::{ErrorCode, IngestError, MirrorError};
pub use expense::{ExpenseRecord, ExpenseSubmission};
pub use mirror::{MirrorSync, RowAppender, SheetsDestination};
pub use pipeline::{ExpenseReply, IngestOutcome, IngestionPipeline};
pub use price::{BondPrice, PriceProvider};
pub use rate::{RateCache, RateSettings};
pub use resolver::ReferenceResolver;
