//! Refresh orchestration for the arrivals service.
//!
//! The crate periodically logs into a back-office behind a login wall that may
//! interpose an e-mailed one-time code, scrapes today's arrivals, and keeps the
//! latest successful result in memory while the next acquisition runs.
//!
//! Component map, leaf first:
//!
//! - [`SessionStore`] persists the cookie bundle between runs.
//! - [`TwoFactorBridge`] parks the login flow until a code is submitted out of band.
//! - [`AuthSession`] drives a browsing context through session reuse, credential
//!   login and the second-factor challenge.
//! - [`ResultCache`] holds the dataset and its per-room view with a TTL.
//! - [`RefreshCoordinator`] owns single-flight execution and the auto-refresh flag.
//! - [`RetentionSweeper`] prunes old exports and page captures.
//!
//! The page-driving side is abstracted behind [`Extractor`]; the binary crate
//! ships an HTTP-form implementation and tests substitute a scripted fake.

pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod extractor;
pub mod retention;
pub mod session_store;
pub mod two_factor;

pub use arrivals_protocol as protocol;
pub use auth::{AuthOutcome, AuthPath, AuthSession, AuthState};
pub use cache::{CacheKey, CachedResult, Dataset, ResultCache, group_by_room};
pub use config::{Credentials, RefreshConfig};
pub use coordinator::{RefreshCoordinator, RefreshStatus, RunPermit, TriggerRejection};
pub use error::{RefreshError, Result, StorageError};
pub use export::{ExportFormat, write_export};
pub use extractor::{Extractor, ExtractorError, ExtractorLauncher};
pub use retention::{RetentionPolicy, RetentionSweeper, SweepReport};
pub use session_store::SessionStore;
pub use two_factor::{CodeProvider, DEFAULT_CHALLENGE_TIMEOUT, TwoFactorBridge};
