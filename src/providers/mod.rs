//! HTTP clients for the bond price feed and the spreadsheet mirror.

pub mod bonds;
pub mod sheets;

pub use bonds::BondPriceProvider;
pub use sheets::SheetsClient;
