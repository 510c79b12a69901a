// Slambana Dashboard - Core Library
// Exposes the roster store, import reconciliation and (with `server`) the HTTP API

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod parser;
pub mod reconciliation;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod startgg;

// Re-export commonly used types
pub use config::Config;
pub use db::RosterStore;
pub use entities::{PaymentMethods, PlayerRecord};
pub use error::{Result, RosterError};
pub use parser::{
    decode_upload, detect_source, get_decoder, RawCandidateRecord, RowDecoder, SourceType,
};
pub use reconciliation::{
    merge, reconcile, CandidateRecord, ImportDecision, ImportReport, ReconcileOptions,
    ReconcilePlan,
};

#[cfg(feature = "server")]
pub use api::{build_router, cors_layer, AppState};
#[cfg(feature = "server")]
pub use startgg::{StartGgClient, StartGgError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
