// House Valuation - Core Library
// Accounts, per-interaction sessions and the prediction audit log around an
// external price model. Used by the CLI and by tests.

pub mod config;
pub mod error;
pub mod db;
pub mod credentials;  // Users + password hashes
pub mod audit;        // Append-only prediction log
pub mod history;      // Derived summaries of a user's log
pub mod session;      // Login / register / forgot state machine
pub mod features;     // Form input + versioned model encoding
pub mod predictor;
pub mod valuation;
pub mod money;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{Error, Result, ValidationError};
pub use db::{setup_database, Store};
pub use credentials::{CredentialStore, User};
pub use audit::{AuditLogEntry, NewAuditEntry, PredictionAuditLog};
pub use history::{average_by_city, history_rows, time_series, write_csv, HistoryRow};
pub use session::{AuthView, Notice, SessionController, SessionState};
pub use features::{
    BhkOrRk, FeatureEncoding, FeatureVector, PostedBy, PropertyForm,
    CATEGORY_CODES_V1, FEATURE_NAMES,
};
pub use predictor::{LinearModel, Predictor, PredictorError};
pub use valuation::{PredictionOutcome, ValuationService};
pub use money::{format_inr, lacs_to_rupees};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
