//! The report store.
//!
//! One [`ReportStore`] is created per report run. Readers feed it through the
//! `visit_*` methods; renderers and plugins read it through the query methods.
//! Ingestion and restore take `&mut self` and queries take `&self`, which gives
//! the single-writer discipline the indices rely on.
//!
//! ```text
//! raw record ─▶ identity ─▶ environment ─▶ retry bucket ─▶ attachment links
//!                                   │
//!                     indices ◀─────┘ ─▶ queries / dump_state
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use freport_error::{ReportError, Result};
use freport_types::{
    Attachment, AttachmentLink, GlobalError, HistoryDataPoint, HistoryTestResult, KnownIssue,
    RawGlobals, RawStepNode, RawTestFixtureResult, RawTestResult, ReaderContext, StatusDetails,
    Step, StepNode, TestCase, TestFixtureResult, TestResult, TestStatistic,
};
use tracing::{debug, info, warn};

use crate::attachment_linker::{AttachmentFilter, AttachmentLinker, prepare_link};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::dump::{DUMP_SCHEMA_VERSION, RestoreOptions, RestoreSummary, StateDump};
use crate::environment::EnvironmentClassifier;
use crate::history::{HistorySource, HistoryTracker, summarize};
use crate::identity::resolve_identity;
use crate::result_file::ResultFile;
use crate::retry::RetryReconciler;

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn duration_of(start: Option<i64>, stop: Option<i64>, duration: Option<i64>) -> Option<i64> {
    duration.or_else(|| match (start, stop) {
        (Some(start), Some(stop)) if stop >= start => stop.checked_sub(start),
        _ => None,
    })
}

/// Append `value` unless already present.
fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Convert a raw step forest, collecting every link it contains.
fn convert_steps(nodes: Vec<RawStepNode>, links: &mut Vec<AttachmentLink>) -> Vec<StepNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            RawStepNode::Step(raw) => {
                let steps = convert_steps(raw.steps, links);
                Some(StepNode::Step(Step {
                    name: raw.name.unwrap_or_default(),
                    status: raw.status.unwrap_or_default(),
                    status_details: StatusDetails {
                        message: raw.message,
                        trace: raw.trace,
                    },
                    start: raw.start,
                    stop: raw.stop,
                    duration: duration_of(raw.start, raw.stop, raw.duration),
                    parameters: raw.parameters,
                    steps,
                }))
            }
            RawStepNode::Attachment(raw) => {
                let Some(link) = prepare_link(&raw) else {
                    warn!(name = ?raw.name, "attachment reference without file name dropped");
                    return None;
                };
                links.push(link.clone());
                Some(StepNode::Attachment(link))
            }
        })
        .collect()
}

pub struct ReportStore {
    classifier: EnvironmentClassifier,
    reconciler: RetryReconciler,
    linker: AttachmentLinker,
    history: HistoryTracker,
    history_source: Option<Box<dyn HistorySource>>,
    clock: Arc<dyn Clock>,

    test_results: BTreeMap<String, TestResult>,
    test_cases: BTreeMap<String, TestCase>,
    fixtures: BTreeMap<String, TestFixtureResult>,
    environments: Vec<String>,
    variables: BTreeMap<String, String>,
    global_errors: Vec<GlobalError>,
    global_attachments: Vec<String>,

    index_tr_by_history: BTreeMap<String, Vec<String>>,
    index_latest_env_by_history: BTreeMap<String, BTreeMap<String, String>>,
    index_attachments_by_tr: BTreeMap<String, Vec<String>>,
    index_fixtures_by_tr: BTreeMap<String, Vec<String>>,
    index_attachments_by_fixture: BTreeMap<String, Vec<String>>,
    index_known_by_history: BTreeMap<String, Vec<KnownIssue>>,
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore")
            .field("test_results", &self.test_results.len())
            .field("attachments", &self.linker.records().len())
            .field("fixtures", &self.fixtures.len())
            .field("environments", &self.environments)
            .field("history_points", &self.history.data_points().len())
            .finish_non_exhaustive()
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::from_valid_config(StoreConfig::default())
    }
}

impl ReportStore {
    /// Create a store after validating `config`.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: StoreConfig) -> Self {
        let classifier = EnvironmentClassifier::new(config.environments);
        let environments = classifier.names();
        Self {
            reconciler: RetryReconciler::new(config.tie_break, config.detect_flaky),
            classifier,
            linker: AttachmentLinker::new(),
            history: HistoryTracker::new(config.history_limit),
            history_source: None,
            clock: Arc::new(SystemClock),
            test_results: BTreeMap::new(),
            test_cases: BTreeMap::new(),
            fixtures: BTreeMap::new(),
            environments,
            variables: config.variables,
            global_errors: Vec::new(),
            global_attachments: Vec::new(),
            index_tr_by_history: BTreeMap::new(),
            index_latest_env_by_history: BTreeMap::new(),
            index_attachments_by_tr: BTreeMap::new(),
            index_fixtures_by_tr: BTreeMap::new(),
            index_attachments_by_fixture: BTreeMap::new(),
            index_known_by_history: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_history_source(mut self, source: Box<dyn HistorySource>) -> Self {
        self.history_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Ingest one raw test result and return the id it was stored under.
    pub fn visit_test_result(&mut self, raw: RawTestResult, ctx: &ReaderContext) -> String {
        let identity = resolve_identity(
            raw.test_id.as_deref(),
            raw.full_name.as_deref(),
            raw.name.as_deref(),
            &raw.parameters,
            raw.history_id.as_deref(),
        );
        if non_empty(raw.test_id.as_deref()).is_none()
            && non_empty(raw.full_name.as_deref()).is_none()
            && non_empty(raw.name.as_deref()).is_none()
            && non_empty(raw.history_id.as_deref()).is_none()
        {
            warn!(
                reader_id = %ctx.reader_id,
                history_id = %identity.history_id,
                "test result has no identifying fields; using fallback identity"
            );
        }
        let environment = self.classifier.classify(&raw.labels).to_owned();
        let start_now = raw.start.is_none();
        let start = raw.start.unwrap_or_else(|| self.clock.now_ms());
        let id = match non_empty(raw.uuid.as_deref()) {
            Some(uuid) if !self.test_results.contains_key(uuid) => uuid.to_owned(),
            _ => self.fresh_tr_id(),
        };

        let mut links = Vec::new();
        let steps = convert_steps(raw.steps, &mut links);
        let name = non_empty(raw.name.as_deref())
            .or_else(|| non_empty(raw.full_name.as_deref()))
            .unwrap_or_default()
            .to_owned();
        let status = raw.status.unwrap_or_default();
        let known = status.is_failure()
            && self
                .index_known_by_history
                .contains_key(&identity.history_id);
        let tr = TestResult {
            id: id.clone(),
            history_id: identity.history_id.clone(),
            test_case_id: identity.test_case_id.clone(),
            name: name.clone(),
            full_name: raw.full_name.clone(),
            status,
            status_details: StatusDetails {
                message: raw.message,
                trace: raw.trace,
            },
            start,
            stop: raw.stop,
            duration: duration_of(Some(start), raw.stop, raw.duration),
            environment: environment.clone(),
            hidden: false,
            flaky: raw.flaky.unwrap_or(false),
            known,
            description: raw.description,
            labels: raw.labels,
            parameters: raw.parameters,
            links: raw.links,
            steps,
            reader_id: ctx.reader_id.clone(),
        };

        // Everything above is pure; indices change only from here on.
        if let Some(test_case_id) = identity.test_case_id {
            self.test_cases
                .entry(test_case_id.clone())
                .or_insert_with(|| TestCase {
                    id: test_case_id,
                    name,
                    full_name: raw.full_name,
                });
        }
        for link in &links {
            self.linker.register_link(link);
            push_unique(
                self.index_attachments_by_tr.entry(id.clone()).or_default(),
                link.attachment_id.clone(),
            );
        }
        self.test_results.insert(id.clone(), tr);
        self.index_tr_by_history
            .entry(identity.history_id.clone())
            .or_default()
            .push(id.clone());
        self.reconciler.admit(&id);
        self.reconcile_bucket(&identity.history_id, &environment);

        debug!(
            tr_id = %id,
            history_id = %identity.history_id,
            environment = %environment,
            reader_id = %ctx.reader_id,
            start_defaulted = start_now,
            attachments = links.len(),
            "test result ingested"
        );
        id
    }

    /// Ingest attachment bytes. The content is read before any index changes,
    /// so a failed read leaves the store untouched.
    pub fn visit_attachment_file(
        &mut self,
        file: &dyn ResultFile,
        ctx: &ReaderContext,
    ) -> Result<String> {
        let bytes = file.read_content()?;
        let record = self
            .linker
            .register_file(file.original_file_name(), file.content_type(), bytes);
        debug!(
            attachment_id = %record.id,
            reader_id = %ctx.reader_id,
            "attachment file ingested"
        );
        Ok(record.id.clone())
    }

    /// Ingest a before/after fixture and index it against the results it wraps.
    pub fn visit_test_fixture_result(
        &mut self,
        raw: RawTestFixtureResult,
        ctx: &ReaderContext,
    ) -> String {
        let id = match non_empty(raw.uuid.as_deref()) {
            Some(uuid) if !self.fixtures.contains_key(uuid) => uuid.to_owned(),
            _ => new_uuid(),
        };
        let mut links = Vec::new();
        let steps = convert_steps(raw.steps, &mut links);
        let fixture = TestFixtureResult {
            id: id.clone(),
            kind: raw.kind,
            name: raw.name.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            status_details: StatusDetails {
                message: raw.message,
                trace: raw.trace,
            },
            start: raw.start,
            stop: raw.stop,
            duration: duration_of(raw.start, raw.stop, raw.duration),
            steps,
            test_result_ids: raw.test_result_ids,
            reader_id: ctx.reader_id.clone(),
        };

        for link in &links {
            self.linker.register_link(link);
            push_unique(
                self.index_attachments_by_fixture.entry(id.clone()).or_default(),
                link.attachment_id.clone(),
            );
        }
        for tr_id in &fixture.test_result_ids {
            push_unique(
                self.index_fixtures_by_tr.entry(tr_id.clone()).or_default(),
                id.clone(),
            );
        }
        debug!(
            fixture_id = %id,
            kind = ?fixture.kind,
            wraps = fixture.test_result_ids.len(),
            reader_id = %ctx.reader_id,
            "fixture ingested"
        );
        self.fixtures.insert(id.clone(), fixture);
        id
    }

    /// Append process-wide errors and attachments.
    pub fn visit_globals(&mut self, raw: RawGlobals, ctx: &ReaderContext) {
        let links: Vec<AttachmentLink> = raw
            .attachments
            .iter()
            .filter_map(|attachment| {
                let link = prepare_link(attachment);
                if link.is_none() {
                    warn!(reader_id = %ctx.reader_id, "global attachment without file name dropped");
                }
                link
            })
            .collect();
        for link in &links {
            self.linker.register_link(link);
            self.global_attachments.push(link.attachment_id.clone());
        }
        debug!(
            errors = raw.errors.len(),
            attachments = links.len(),
            reader_id = %ctx.reader_id,
            "globals ingested"
        );
        self.global_errors.extend(raw.errors);
    }

    /// Register known issues and flag matching failed results.
    pub fn visit_known_issues(&mut self, issues: Vec<KnownIssue>) {
        let mut touched = BTreeSet::new();
        for issue in issues {
            touched.insert(issue.history_id.clone());
            push_unique(
                self.index_known_by_history
                    .entry(issue.history_id.clone())
                    .or_default(),
                issue,
            );
        }
        for history_id in &touched {
            self.refresh_known(history_id);
        }
        info!(history_ids = touched.len(), "known issues registered");
    }

    // -----------------------------------------------------------------------
    // Internal index maintenance
    // -----------------------------------------------------------------------

    fn fresh_tr_id(&self) -> String {
        loop {
            let id = new_uuid();
            if !self.test_results.contains_key(&id) {
                return id;
            }
        }
    }

    fn reconcile_bucket(&mut self, history_id: &str, environment: &str) {
        let members = self
            .index_tr_by_history
            .get(history_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let head =
            self.reconciler
                .reconcile(history_id, environment, members, &mut self.test_results);
        let latest = self
            .index_latest_env_by_history
            .entry(history_id.to_owned())
            .or_default();
        match head {
            Some(head) => {
                latest.insert(environment.to_owned(), head);
            }
            None => {
                latest.remove(environment);
            }
        }
        if latest.is_empty() {
            self.index_latest_env_by_history.remove(history_id);
        }
    }

    fn refresh_known(&mut self, history_id: &str) {
        let has_issue = self.index_known_by_history.contains_key(history_id);
        let Some(ids) = self.index_tr_by_history.get(history_id) else {
            return;
        };
        for id in ids {
            if let Some(tr) = self.test_results.get_mut(id) {
                tr.known = has_issue && tr.status.is_failure();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries: results
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn test_result_by_id(&self, id: &str) -> Option<&TestResult> {
        self.test_results.get(id)
    }

    /// Visible results, plus hidden retries when `include_hidden`.
    #[must_use]
    pub fn all_test_results(&self, include_hidden: bool) -> Vec<&TestResult> {
        self.test_results
            .values()
            .filter(|tr| include_hidden || !tr.hidden)
            .collect()
    }

    /// Visible results assigned to `environment`.
    #[must_use]
    pub fn test_results_by_environment(&self, environment: &str) -> Vec<&TestResult> {
        self.test_results
            .values()
            .filter(|tr| tr.environment == environment && !tr.hidden)
            .collect()
    }

    /// Environment → visible result for one history id.
    #[must_use]
    pub fn latest_by_environment(&self, history_id: &str) -> BTreeMap<&str, &TestResult> {
        self.index_latest_env_by_history
            .get(history_id)
            .into_iter()
            .flatten()
            .filter_map(|(env, id)| self.test_results.get(id).map(|tr| (env.as_str(), tr)))
            .collect()
    }

    /// Other members of the result's bucket, newest first.
    #[must_use]
    pub fn retries_by_tr_id(&self, id: &str) -> Vec<&TestResult> {
        let Some(tr) = self.test_results.get(id) else {
            return Vec::new();
        };
        let members = self
            .index_tr_by_history
            .get(&tr.history_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.reconciler
            .bucket_order(&tr.environment, members, &self.test_results)
            .iter()
            .filter(|member| member.as_str() != id)
            .filter_map(|member| self.test_results.get(member))
            .collect()
    }

    #[must_use]
    pub fn all_test_cases(&self) -> Vec<&TestCase> {
        self.test_cases.values().collect()
    }

    #[must_use]
    pub fn fixtures_by_tr_id(&self, id: &str) -> Vec<&TestFixtureResult> {
        self.index_fixtures_by_tr
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|fixture_id| self.fixtures.get(fixture_id))
            .collect()
    }

    /// Counts over visible results accepted by `filter`.
    #[must_use]
    pub fn test_statistic(&self, filter: impl Fn(&TestResult) -> bool) -> TestStatistic {
        let mut stat = TestStatistic::default();
        for tr in self.test_results.values().filter(|tr| !tr.hidden && filter(tr)) {
            stat.record(tr.status);
            if tr.flaky {
                stat.flaky += 1;
            }
            stat.retries += self.retries_by_tr_id(&tr.id).len();
            if self.is_new(tr) {
                stat.new += 1;
            }
        }
        stat
    }

    // -----------------------------------------------------------------------
    // Queries: environments and variables
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn all_environments(&self) -> &[String] {
        &self.environments
    }

    #[must_use]
    pub fn all_variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Report variables overlaid with the environment's own variables.
    #[must_use]
    pub fn env_variables(&self, environment: &str) -> BTreeMap<String, String> {
        let mut merged = self.variables.clone();
        if let Some(own) = self.classifier.variables(environment) {
            merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    // -----------------------------------------------------------------------
    // Queries: attachments and globals
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn attachments_by_tr_id(&self, id: &str) -> Vec<&Attachment> {
        self.index_attachments_by_tr
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|attachment_id| self.linker.get(attachment_id))
            .collect()
    }

    #[must_use]
    pub fn attachments_by_fixture_id(&self, id: &str) -> Vec<&Attachment> {
        self.index_attachments_by_fixture
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|attachment_id| self.linker.get(attachment_id))
            .collect()
    }

    #[must_use]
    pub fn all_attachments(&self, filter: AttachmentFilter) -> Vec<&Attachment> {
        self.linker.all(filter)
    }

    #[must_use]
    pub fn attachment_by_id(&self, id: &str) -> Option<&Attachment> {
        self.linker.get(id)
    }

    /// Bytes of an attachment, or `None` when they never arrived.
    #[must_use]
    pub fn attachment_content_by_id(&self, id: &str) -> Option<&[u8]> {
        self.linker.content(id)
    }

    #[must_use]
    pub fn all_global_errors(&self) -> &[GlobalError] {
        &self.global_errors
    }

    #[must_use]
    pub fn all_global_attachments(&self) -> Vec<&Attachment> {
        self.global_attachments
            .iter()
            .filter_map(|id| self.linker.get(id))
            .collect()
    }

    #[must_use]
    pub fn all_known_issues(&self) -> Vec<&KnownIssue> {
        self.index_known_by_history.values().flatten().collect()
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Load history from the configured source. Without a source the history
    /// stays empty.
    pub fn read_history(&mut self) -> Result<usize> {
        let Some(source) = self.history_source.as_ref() else {
            debug!("no history source configured");
            return Ok(0);
        };
        let points = source.read_history()?;
        self.history.load(points);
        Ok(self.history.data_points().len())
    }

    /// Load an already-fetched sequence of data points.
    pub fn load_history(&mut self, points: Vec<HistoryDataPoint>) {
        self.history.load(points);
    }

    /// Newest first.
    #[must_use]
    pub fn all_history_data_points(&self) -> &[HistoryDataPoint] {
        self.history.data_points()
    }

    /// Earlier summaries of the result's test, newest first.
    #[must_use]
    pub fn history_by_tr_id(&self, id: &str) -> Vec<&HistoryTestResult> {
        self.test_results
            .get(id)
            .map(|tr| self.history.by_history_id(&tr.history_id))
            .unwrap_or_default()
    }

    fn is_new(&self, tr: &TestResult) -> bool {
        tr.test_case_id
            .as_deref()
            .is_some_and(|test_case_id| !self.history.knows_test_case(test_case_id))
    }

    /// Visible results whose test case no history point has seen.
    #[must_use]
    pub fn all_new_test_results(&self) -> Vec<&TestResult> {
        self.test_results
            .values()
            .filter(|tr| !tr.hidden && self.is_new(tr))
            .collect()
    }

    /// Snapshot the visible results as a history data point.
    #[must_use]
    pub fn build_history_data_point(&self, name: Option<String>) -> HistoryDataPoint {
        let test_results = self
            .test_results
            .values()
            .filter(|tr| !tr.hidden)
            .map(|tr| (tr.history_id.clone(), summarize(tr)))
            .collect();
        HistoryDataPoint {
            uuid: new_uuid(),
            name,
            timestamp: self.clock.now_ms(),
            test_results,
            known_test_case_ids: self.test_cases.keys().cloned().collect(),
            url: None,
        }
    }

    /// Build a data point for this run and hand it to the history source.
    pub fn append_history(&mut self, name: Option<String>) -> Result<HistoryDataPoint> {
        let point = self.build_history_data_point(name);
        let Some(source) = self.history_source.as_mut() else {
            debug!("no history source configured; data point not persisted");
            return Ok(point);
        };
        source.append_history(point.clone())?;
        info!(
            uuid = %point.uuid,
            test_results = point.test_results.len(),
            "history data point appended"
        );
        Ok(point)
    }

    // -----------------------------------------------------------------------
    // State dump / restore
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn dump_state(&self) -> StateDump {
        StateDump {
            schema_version: DUMP_SCHEMA_VERSION,
            test_results: self.test_results.clone(),
            attachments: self.linker.records().clone(),
            test_cases: self.test_cases.clone(),
            fixtures: self.fixtures.clone(),
            environments: self.environments.clone(),
            report_variables: self.variables.clone(),
            global_attachments: self.global_attachments.clone(),
            global_errors: self.global_errors.clone(),
            index_test_result_by_history_id: self.index_tr_by_history.clone(),
            index_latest_env_test_result_by_history_id: self.index_latest_env_by_history.clone(),
            index_attachment_by_test_result: self.index_attachments_by_tr.clone(),
            index_fixtures_by_test_result: self.index_fixtures_by_tr.clone(),
            index_attachment_by_fixture: self.index_attachments_by_fixture.clone(),
            index_known_by_history_id: self.index_known_by_history.clone(),
        }
    }

    /// Attachment bytes keyed by id, the companion of [`Self::dump_state`].
    #[must_use]
    pub fn dump_attachment_contents(&self) -> BTreeMap<String, Vec<u8>> {
        self.linker
            .contents()
            .iter()
            .map(|(id, bytes)| (id.clone(), bytes.clone()))
            .collect()
    }

    /// Decode a JSON dump and merge it. Non-object values are rejected.
    pub fn restore_state_json(
        &mut self,
        value: serde_json::Value,
        options: RestoreOptions,
    ) -> Result<RestoreSummary> {
        let dump = StateDump::from_value(value)?;
        self.restore_state(dump, options)
    }

    /// Merge a dump into this store. Nothing already present is removed.
    ///
    /// Results keep their ids; index lists are concatenated without
    /// duplicates; then every touched `(history_id, environment)` bucket is
    /// reconciled over the union, so each bucket ends with one visible result.
    pub fn restore_state(
        &mut self,
        dump: StateDump,
        options: RestoreOptions,
    ) -> Result<RestoreSummary> {
        if dump.schema_version > DUMP_SCHEMA_VERSION {
            return Err(ReportError::UnsupportedDumpVersion {
                found: dump.schema_version,
                supported: DUMP_SCHEMA_VERSION,
            });
        }
        let mut summary = RestoreSummary {
            test_results: dump.test_results.len(),
            attachments: dump.attachments.len(),
            fixtures: dump.fixtures.len(),
            buckets_reconciled: 0,
        };

        for attachment in dump.attachments.into_values() {
            self.linker.merge_record(attachment);
        }
        for (id, bytes) in options.attachment_contents {
            if !self.linker.restore_content(&id, bytes) {
                warn!(attachment_id = %id, "restored content has no attachment record; dropped");
            }
        }

        // Arrival order: the dump's history index first, then anything it missed.
        let mut incoming = dump.test_results;
        let mut order: Vec<String> = dump
            .index_test_result_by_history_id
            .values()
            .flatten()
            .filter(|id| incoming.contains_key(*id))
            .cloned()
            .collect();
        let listed: BTreeSet<&String> = order.iter().collect();
        let unlisted: Vec<String> = incoming
            .keys()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        order.extend(unlisted);

        let mut touched: BTreeSet<(String, String)> = BTreeSet::new();
        for id in order {
            let Some(tr) = incoming.remove(&id) else {
                continue;
            };
            if let Some(previous) = self.test_results.get(&id) {
                if previous.history_id != tr.history_id || previous.environment != tr.environment {
                    if let Some(ids) = self.index_tr_by_history.get_mut(&previous.history_id) {
                        ids.retain(|existing| existing != &id);
                    }
                    touched.insert((previous.history_id.clone(), previous.environment.clone()));
                }
            }
            push_unique(
                self.index_tr_by_history
                    .entry(tr.history_id.clone())
                    .or_default(),
                id.clone(),
            );
            touched.insert((tr.history_id.clone(), tr.environment.clone()));
            self.reconciler.admit(&id);
            push_unique(&mut self.environments, tr.environment.clone());
            self.test_results.insert(id, tr);
        }
        self.index_tr_by_history.retain(|_, ids| !ids.is_empty());

        for (id, test_case) in dump.test_cases {
            self.test_cases.entry(id).or_insert(test_case);
        }
        for (id, fixture) in dump.fixtures {
            self.fixtures.insert(id, fixture);
        }
        for environment in dump.environments {
            push_unique(&mut self.environments, environment);
        }
        for (key, value) in dump.report_variables {
            self.variables.entry(key).or_insert(value);
        }
        self.global_attachments.extend(dump.global_attachments);
        self.global_errors.extend(dump.global_errors);

        merge_index(&mut self.index_attachments_by_tr, dump.index_attachment_by_test_result);
        merge_index(&mut self.index_fixtures_by_tr, dump.index_fixtures_by_test_result);
        merge_index(&mut self.index_attachments_by_fixture, dump.index_attachment_by_fixture);
        let known_ids: Vec<String> = dump.index_known_by_history_id.keys().cloned().collect();
        merge_index(&mut self.index_known_by_history, dump.index_known_by_history_id);

        for (history_id, environment) in &touched {
            self.reconcile_bucket(history_id, environment);
        }
        summary.buckets_reconciled = touched.len();
        let refresh: BTreeSet<String> = touched
            .into_iter()
            .map(|(history_id, _)| history_id)
            .chain(known_ids)
            .collect();
        for history_id in &refresh {
            self.refresh_known(history_id);
        }

        info!(
            test_results = summary.test_results,
            attachments = summary.attachments,
            fixtures = summary.fixtures,
            buckets = summary.buckets_reconciled,
            "state restored"
        );
        Ok(summary)
    }
}

/// Key-by-key concatenation, skipping entries already present.
fn merge_index<T: PartialEq>(target: &mut BTreeMap<String, Vec<T>>, incoming: BTreeMap<String, Vec<T>>) {
    for (key, values) in incoming {
        let list = target.entry(key).or_default();
        for value in values {
            push_unique(list, value);
        }
    }
}
