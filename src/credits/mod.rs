//! Carbon credit arithmetic and token amount formatting.

pub mod calculation;
pub mod format;

pub use calculation::{calculate_credits, credits_for_plantation, EcosystemType};
pub use format::{format_ether, format_token_amount, parse_ether};
