pub mod client;
pub mod config;
mod error;
pub mod lookup;
pub mod routes;
pub mod stats;
pub mod types;
pub mod utils;

pub use client::{ConsoleClient, TokenUsageApi};
pub use config::ConsoleConfig;
pub use error::{Result, UsageLensError};
pub use lookup::{
    LOGS_FALLBACK_MESSAGE, TOKEN_REQUIRED_MESSAGE, USAGE_FALLBACK_MESSAGE, UsageLookup,
};
pub use routes::{
    GateDecision, RouteDef, RouteTable, RouteVisibility, Session, gate, pricing_visibility,
};
pub use stats::{
    QUOTA_PER_UNIT, StatRow, expiry_label, format_currency_from_tokens, format_timestamp,
    summary_rows,
};
pub use types::{
    DEFAULT_PAGE_SIZE, LogEntry, LogKind, LogPage, LogRow, PAGE_SIZE_OPTIONS, QueryOutcome,
    TokenLogs, UsageSummary,
};
