use std::collections::BTreeMap;
use std::sync::Arc;

use freport_store::{
    EnvironmentConfig, EnvironmentMatcher, FixedClock, ReportStore, StoreConfig, TieBreak,
    init_test_logging, sha256_hex,
};
use freport_types::{Label, Parameter, RawTestResult, ReaderContext, TestStatus};
use proptest::prelude::*;

fn ctx() -> ReaderContext {
    ReaderContext::new("retry-tests")
}

fn attempt(name: &str, full_name: &str, start: i64, status: TestStatus) -> RawTestResult {
    RawTestResult {
        name: Some(name.to_owned()),
        full_name: Some(full_name.to_owned()),
        start: Some(start),
        status: Some(status),
        ..RawTestResult::default()
    }
}

fn os_config() -> StoreConfig {
    let mut config = StoreConfig::default();
    config.environments.push(EnvironmentConfig::new(
        "linux",
        EnvironmentMatcher::label_equals("os", "linux"),
    ));
    config
}

#[test]
fn newest_attempt_is_the_only_visible_result() {
    init_test_logging();
    let mut store = ReportStore::default();
    store.visit_test_result(attempt("t1", "s", 1000, TestStatus::Passed), &ctx());
    store.visit_test_result(attempt("t2", "s", 0, TestStatus::Passed), &ctx());

    let visible = store.all_test_results(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name, "t1");
    assert!(!visible[0].hidden);

    let everything = store.all_test_results(true);
    assert_eq!(everything.len(), 2);
    let t2 = everything
        .iter()
        .find(|tr| tr.name == "t2")
        .expect("t2 reachable with hidden results");
    assert!(t2.hidden);

    let retries = store.retries_by_tr_id(&visible[0].id);
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].id, t2.id);
}

#[test]
fn test_id_without_parameters_hashes_empty_signature() {
    let mut store = ReportStore::default();
    let id = store.visit_test_result(
        RawTestResult {
            test_id: Some("some".to_owned()),
            ..RawTestResult::default()
        },
        &ctx(),
    );
    let tr = store.test_result_by_id(&id).expect("stored");
    assert_eq!(tr.history_id, format!("{}.{}", sha256_hex("some"), sha256_hex("")));
}

#[test]
fn parameters_split_buckets_but_hidden_ones_do_not() {
    let mut store = ReportStore::default();
    let mut chrome = attempt("login", "auth.login", 10, TestStatus::Passed);
    chrome.parameters.push(Parameter::new("browser", "chrome"));
    let mut firefox = attempt("login", "auth.login", 5, TestStatus::Passed);
    firefox.parameters.push(Parameter::new("browser", "firefox"));
    let mut chrome_retry = attempt("login", "auth.login", 1, TestStatus::Failed);
    chrome_retry.parameters.push(Parameter::new("browser", "chrome"));
    chrome_retry.parameters.push(Parameter {
        hidden: true,
        ..Parameter::new("seed", "42")
    });

    store.visit_test_result(chrome, &ctx());
    store.visit_test_result(firefox, &ctx());
    store.visit_test_result(chrome_retry, &ctx());

    let visible = store.all_test_results(false);
    assert_eq!(visible.len(), 2);
    assert_eq!(store.all_test_results(true).len(), 3);
    let chrome = visible.iter().find(|tr| tr.start == 10).expect("chrome visible");
    assert!(chrome.flaky, "passed after a failed retry");
    assert_eq!(store.test_statistic(|_| true).retries, 1);
}

#[test]
fn environments_keep_their_own_visible_result() {
    let mut store = ReportStore::new(os_config()).expect("config");
    let mut on_linux = attempt("t", "suite.t", 10, TestStatus::Passed);
    on_linux.labels.push(Label::new("os", "linux"));
    let linux_id = store.visit_test_result(on_linux, &ctx());
    let default_id = store.visit_test_result(attempt("t", "suite.t", 999, TestStatus::Failed), &ctx());

    assert!(!store.test_result_by_id(&linux_id).expect("linux").hidden);
    assert!(!store.test_result_by_id(&default_id).expect("default").hidden);
    assert!(store.retries_by_tr_id(&linux_id).is_empty());

    let history_id = store.test_result_by_id(&linux_id).expect("linux").history_id.clone();
    let latest = store.latest_by_environment(&history_id);
    assert_eq!(latest["linux"].id, linux_id);
    assert_eq!(latest["default"].id, default_id);
}

#[test]
fn first_ingested_policy_keeps_earlier_tie() {
    let config = StoreConfig {
        tie_break: TieBreak::FirstIngestedWins,
        ..StoreConfig::default()
    };
    let mut store = ReportStore::new(config)
        .expect("config")
        .with_clock(Arc::new(FixedClock::new(42)));
    let first = store.visit_test_result(
        RawTestResult {
            name: Some("tie".to_owned()),
            ..RawTestResult::default()
        },
        &ctx(),
    );
    let second = store.visit_test_result(
        RawTestResult {
            name: Some("tie".to_owned()),
            ..RawTestResult::default()
        },
        &ctx(),
    );
    assert!(!store.test_result_by_id(&first).expect("first").hidden);
    assert!(store.test_result_by_id(&second).expect("second").hidden);
}

#[test]
fn flaky_detection_can_be_disabled() {
    let config = StoreConfig {
        detect_flaky: false,
        ..StoreConfig::default()
    };
    let mut store = ReportStore::new(config).expect("config");
    store.visit_test_result(attempt("t", "s.t", 1, TestStatus::Broken), &ctx());
    let id = store.visit_test_result(attempt("t", "s.t", 2, TestStatus::Passed), &ctx());
    assert!(!store.test_result_by_id(&id).expect("visible").flaky);
}

proptest! {
    #[test]
    fn exactly_one_visible_per_bucket(
        rows in prop::collection::vec((0_usize..3, any::<bool>(), 0_i64..50), 1..24)
    ) {
        let mut store = ReportStore::new(os_config()).expect("config");
        for (test, linux, start) in &rows {
            let mut raw = attempt("t", &format!("suite.t{test}"), *start, TestStatus::Passed);
            if *linux {
                raw.labels.push(Label::new("os", "linux"));
            }
            store.visit_test_result(raw, &ctx());
        }

        let mut buckets: BTreeMap<(String, String), Vec<(i64, bool, String)>> = BTreeMap::new();
        for tr in store.all_test_results(true) {
            buckets
                .entry((tr.history_id.clone(), tr.environment.clone()))
                .or_default()
                .push((tr.start, tr.hidden, tr.id.clone()));
        }
        for members in buckets.values() {
            let visible: Vec<_> = members.iter().filter(|(_, hidden, _)| !hidden).collect();
            prop_assert_eq!(visible.len(), 1);
            let max_start = members.iter().map(|(start, _, _)| *start).max().unwrap_or_default();
            prop_assert_eq!(visible[0].0, max_start);

            let retries = store.retries_by_tr_id(&visible[0].2);
            prop_assert_eq!(retries.len(), members.len() - 1);
            prop_assert!(retries.windows(2).all(|pair| pair[0].start >= pair[1].start));
            prop_assert!(retries.iter().all(|tr| tr.hidden));
        }
        prop_assert_eq!(store.all_test_results(false).len(), buckets.len());
    }
}
