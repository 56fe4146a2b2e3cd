//! Core data model shared by the FrankenReport store and its consumers.
//!
//! Canonical records ([`TestResult`], [`Attachment`], [`HistoryDataPoint`],
//! ...) are what renderers and plugins read. Raw records ([`raw`]) are what
//! format-specific readers hand to the store; every field on a raw record is
//! optional and the store fills in deterministic defaults.

pub mod attachment;
pub mod history;
pub mod meta;
pub mod raw;
pub mod status;
pub mod step;
pub mod test_result;

pub use attachment::{Attachment, ContentTypeSource, GENERIC_BINARY_CONTENT_TYPE};
pub use history::{HistoryDataPoint, HistoryTestResult};
pub use meta::{GlobalError, KnownIssue, Label, Link, Parameter};
pub use raw::{
    RawAttachmentRef, RawGlobals, RawStep, RawStepNode, RawTestFixtureResult, RawTestResult,
    ReaderContext,
};
pub use status::{StatusDetails, TestStatus};
pub use step::{AttachmentLink, Step, StepNode, collect_links};
pub use test_result::{
    DEFAULT_ENVIRONMENT, FixtureKind, TestCase, TestFixtureResult, TestResult, TestStatistic,
};
