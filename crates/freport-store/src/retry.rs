//! Retry reconciliation.
//!
//! Results sharing a `(history_id, environment)` pair form a bucket. The
//! bucket is ordered by start timestamp descending; the head is visible and
//! every other member is a hidden retry. Equal start timestamps are ordered by
//! arrival according to the configured [`TieBreak`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use freport_types::{TestResult, TestStatus};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::TieBreak;

/// Ordered member ids of one bucket, newest first.
pub type BucketOrder = SmallVec<[String; 4]>;

#[derive(Debug, Clone)]
pub struct RetryReconciler {
    tie_break: TieBreak,
    detect_flaky: bool,
    arrival: HashMap<String, u64>,
    next_arrival: u64,
}

impl RetryReconciler {
    #[must_use]
    pub fn new(tie_break: TieBreak, detect_flaky: bool) -> Self {
        Self {
            tie_break,
            detect_flaky,
            arrival: HashMap::new(),
            next_arrival: 0,
        }
    }

    /// Record the arrival position of a result id. Re-admitting an id keeps
    /// its original position.
    pub fn admit(&mut self, tr_id: &str) -> u64 {
        if let Some(&seq) = self.arrival.get(tr_id) {
            return seq;
        }
        let seq = self.next_arrival;
        self.next_arrival = self.next_arrival.saturating_add(1);
        self.arrival.insert(tr_id.to_owned(), seq);
        seq
    }

    fn arrival_of(&self, tr_id: &str) -> u64 {
        self.arrival.get(tr_id).copied().unwrap_or(u64::MAX)
    }

    fn compare(&self, a: &TestResult, b: &TestResult) -> Ordering {
        let by_start = b.start.cmp(&a.start);
        let (seq_a, seq_b) = (self.arrival_of(&a.id), self.arrival_of(&b.id));
        let by_arrival = match self.tie_break {
            TieBreak::LastIngestedWins => seq_b.cmp(&seq_a),
            TieBreak::FirstIngestedWins => seq_a.cmp(&seq_b),
        };
        by_start.then(by_arrival)
    }

    /// Members of the `environment` bucket among `member_ids`, newest first.
    #[must_use]
    pub fn bucket_order(
        &self,
        environment: &str,
        member_ids: &[String],
        results: &BTreeMap<String, TestResult>,
    ) -> BucketOrder {
        let mut members: SmallVec<[&TestResult; 4]> = member_ids
            .iter()
            .filter_map(|id| results.get(id))
            .filter(|tr| tr.environment == environment)
            .collect();
        members.sort_by(|a, b| self.compare(a, b));
        members.into_iter().map(|tr| tr.id.clone()).collect()
    }

    /// Recompute the hidden flags of one bucket and return the visible id.
    pub fn reconcile(
        &self,
        history_id: &str,
        environment: &str,
        member_ids: &[String],
        results: &mut BTreeMap<String, TestResult>,
    ) -> Option<String> {
        let order = self.bucket_order(environment, member_ids, results);
        let head = order.first()?.clone();

        let retry_failed = order[1..]
            .iter()
            .filter_map(|id| results.get(id))
            .any(|tr| tr.status.is_failure());

        for (position, id) in order.iter().enumerate() {
            if let Some(tr) = results.get_mut(id) {
                tr.hidden = position != 0;
            }
        }
        if self.detect_flaky && retry_failed {
            if let Some(tr) = results.get_mut(&head) {
                if tr.status == TestStatus::Passed {
                    tr.flaky = true;
                }
            }
        }

        debug!(
            history_id = %history_id,
            environment = %environment,
            visible = %head,
            retries = order.len() - 1,
            "bucket reconciled"
        );
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freport_types::DEFAULT_ENVIRONMENT;

    fn tr(id: &str, start: i64, env: &str, status: TestStatus) -> TestResult {
        TestResult {
            id: id.to_owned(),
            history_id: "h".to_owned(),
            test_case_id: None,
            name: id.to_owned(),
            full_name: None,
            status,
            status_details: Default::default(),
            start,
            stop: None,
            duration: None,
            environment: env.to_owned(),
            hidden: false,
            flaky: false,
            known: false,
            description: None,
            labels: Vec::new(),
            parameters: Vec::new(),
            links: Vec::new(),
            steps: Vec::new(),
            reader_id: String::new(),
        }
    }

    fn setup(
        tie_break: TieBreak,
        rows: &[(&str, i64, &str, TestStatus)],
    ) -> (RetryReconciler, Vec<String>, BTreeMap<String, TestResult>) {
        let mut reconciler = RetryReconciler::new(tie_break, true);
        let mut ids = Vec::new();
        let mut results = BTreeMap::new();
        for &(id, start, env, status) in rows {
            reconciler.admit(id);
            ids.push(id.to_owned());
            results.insert(id.to_owned(), tr(id, start, env, status));
        }
        (reconciler, ids, results)
    }

    #[test]
    fn latest_start_is_visible() {
        let (reconciler, ids, mut results) = setup(
            TieBreak::LastIngestedWins,
            &[
                ("a", 100, DEFAULT_ENVIRONMENT, TestStatus::Failed),
                ("b", 300, DEFAULT_ENVIRONMENT, TestStatus::Passed),
                ("c", 200, DEFAULT_ENVIRONMENT, TestStatus::Failed),
            ],
        );
        let head = reconciler.reconcile("h", DEFAULT_ENVIRONMENT, &ids, &mut results);
        assert_eq!(head.as_deref(), Some("b"));
        assert!(!results["b"].hidden);
        assert!(results["a"].hidden && results["c"].hidden);
        assert!(results["b"].flaky, "passed after failed retries is flaky");
        let order = reconciler.bucket_order(DEFAULT_ENVIRONMENT, &ids, &results);
        assert_eq!(order.as_slice(), ["b", "c", "a"]);
    }

    #[test]
    fn equal_start_last_ingested_wins() {
        let (reconciler, ids, mut results) = setup(
            TieBreak::LastIngestedWins,
            &[
                ("first", 50, DEFAULT_ENVIRONMENT, TestStatus::Passed),
                ("second", 50, DEFAULT_ENVIRONMENT, TestStatus::Passed),
            ],
        );
        let head = reconciler.reconcile("h", DEFAULT_ENVIRONMENT, &ids, &mut results);
        assert_eq!(head.as_deref(), Some("second"));
    }

    #[test]
    fn equal_start_first_ingested_wins() {
        let (reconciler, ids, mut results) = setup(
            TieBreak::FirstIngestedWins,
            &[
                ("first", 50, DEFAULT_ENVIRONMENT, TestStatus::Passed),
                ("second", 50, DEFAULT_ENVIRONMENT, TestStatus::Passed),
            ],
        );
        let head = reconciler.reconcile("h", DEFAULT_ENVIRONMENT, &ids, &mut results);
        assert_eq!(head.as_deref(), Some("first"));
    }

    #[test]
    fn environments_do_not_hide_each_other() {
        let (reconciler, ids, mut results) = setup(
            TieBreak::LastIngestedWins,
            &[
                ("lin", 10, "linux", TestStatus::Passed),
                ("def", 99, DEFAULT_ENVIRONMENT, TestStatus::Passed),
            ],
        );
        reconciler.reconcile("h", "linux", &ids, &mut results);
        reconciler.reconcile("h", DEFAULT_ENVIRONMENT, &ids, &mut results);
        assert!(!results["lin"].hidden);
        assert!(!results["def"].hidden);
    }

    #[test]
    fn readmit_keeps_position() {
        let mut reconciler = RetryReconciler::new(TieBreak::LastIngestedWins, false);
        assert_eq!(reconciler.admit("x"), 0);
        assert_eq!(reconciler.admit("y"), 1);
        assert_eq!(reconciler.admit("x"), 0);
    }

    #[test]
    fn empty_bucket_has_no_head() {
        let (reconciler, ids, mut results) = setup(
            TieBreak::LastIngestedWins,
            &[("a", 1, "linux", TestStatus::Passed)],
        );
        assert!(
            reconciler
                .reconcile("h", DEFAULT_ENVIRONMENT, &ids, &mut results)
                .is_none()
        );
    }
}
