//! Turning raw payloads into normalized output.
//!
//! - `normalize`: API JSON items onto a category's field schema
//! - `table`: listing tables onto records by positional column rules
//! - `quote`: label-anchored quote extraction from rendered text
//! - `financials`: the sectioned financial-results comparison table

pub mod financials;
pub mod normalize;
pub mod quote;
pub mod table;

pub use financials::{parse_financial_results, FinancialResults};
pub use normalize::{normalize, FieldMapping, FieldRule, NormalizedRecord};
pub use quote::{parse_quote, EquityQuote};
pub use table::{extract_table, ColumnRule, TableSpec};
