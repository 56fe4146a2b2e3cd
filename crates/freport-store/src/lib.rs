//! FrankenReport store: reconciliation and indexing for test results.
//!
//! Format-specific readers push raw records in through the `visit_*` methods
//! on [`ReportStore`]; renderers, chart builders and quality gates read back a
//! consistent model:
//!
//! - retried executions collapse to one visible result per test and
//!   environment ([`retry`]),
//! - attachment links and attachment bytes meet regardless of arrival order
//!   ([`attachment_linker`]),
//! - results are routed to configured environments ([`environment`]),
//! - history from previous runs is attached per test ([`history`]),
//! - the whole state can be dumped and merged across shards ([`dump`]).

pub mod attachment_linker;
pub mod clock;
pub mod config;
pub mod content_type;
pub mod dump;
pub mod environment;
pub mod history;
pub mod identity;
pub mod logging;
pub mod result_file;
pub mod retry;
pub mod shared;
pub mod store;

pub use attachment_linker::{AttachmentFilter, AttachmentLinker, attachment_id};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EnvironmentConfig, EnvironmentMatcher, LoggingConfig, StoreConfig, TieBreak};
pub use dump::{DUMP_SCHEMA_VERSION, RestoreOptions, RestoreSummary, StateDump};
pub use environment::EnvironmentClassifier;
pub use history::{HistorySource, HistoryTracker, InMemoryHistory, JsonlHistory};
pub use identity::{Identity, resolve_identity, sha256_hex};
pub use logging::{init_logging, init_test_logging};
pub use result_file::{BufferResultFile, PathResultFile, ResultFile};
pub use retry::RetryReconciler;
pub use shared::SharedReportStore;
pub use store::ReportStore;

pub use freport_error::{ReportError, Result};
