use freport_store::{AttachmentFilter, BufferResultFile, ReportStore, attachment_id};
use freport_types::{
    GENERIC_BINARY_CONTENT_TYPE, RawAttachmentRef, RawStep, RawStepNode, RawTestResult,
    ReaderContext,
};
use proptest::prelude::*;

fn ctx() -> ReaderContext {
    ReaderContext::new("attachment-tests")
}

fn attachment_ref(file: &str, content_type: Option<&str>) -> RawStepNode {
    RawStepNode::Attachment(RawAttachmentRef {
        name: Some(format!("{file} (exposed)")),
        original_file_name: Some(file.to_owned()),
        content_type: content_type.map(str::to_owned),
    })
}

fn with_steps(name: &str, steps: Vec<RawStepNode>) -> RawTestResult {
    RawTestResult {
        name: Some(name.to_owned()),
        full_name: Some(format!("suite.{name}")),
        start: Some(1),
        steps,
        ..RawTestResult::default()
    }
}

#[test]
fn nested_links_are_indexed_per_result_and_deduplicated() {
    let mut store = ReportStore::default();
    let nested = RawStepNode::Step(RawStep {
        name: Some("open page".to_owned()),
        steps: vec![attachment_ref("page.html", None)],
        ..RawStep::default()
    });
    let id = store.visit_test_result(
        with_steps(
            "t",
            vec![
                nested,
                attachment_ref("page.html", None),
                attachment_ref("trace.zip", None),
            ],
        ),
        &ctx(),
    );

    let attachments = store.attachments_by_tr_id(&id);
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].original_file_name, "page.html");
    assert_eq!(attachments[0].content_type, "text/html");
    assert_eq!(attachments[1].ext, ".zip");

    let tr = store.test_result_by_id(&id).expect("stored");
    assert_eq!(tr.attachment_links().len(), 3);
}

#[test]
fn missed_and_unused_need_opt_in() {
    let mut store = ReportStore::default();
    store.visit_test_result(with_steps("t", vec![attachment_ref("never.log", None)]), &ctx());
    store
        .visit_attachment_file(&BufferResultFile::new("orphan.txt", b"hello".to_vec()), &ctx())
        .expect("buffer read");

    assert!(store.all_attachments(AttachmentFilter::default()).is_empty());

    let missed = store.all_attachments(AttachmentFilter {
        include_missed: true,
        ..AttachmentFilter::default()
    });
    assert_eq!(missed.len(), 1);
    assert!(missed[0].used && missed[0].missed);
    assert!(store.attachment_content_by_id(&missed[0].id).is_none());

    let unused = store.all_attachments(AttachmentFilter {
        include_unused: true,
        ..AttachmentFilter::default()
    });
    assert_eq!(unused.len(), 1);
    assert!(!unused[0].used);
    assert_eq!(
        store.attachment_content_by_id(&attachment_id("orphan.txt")),
        Some(&b"hello"[..])
    );

    assert_eq!(store.all_attachments(AttachmentFilter::everything()).len(), 2);
}

#[test]
fn backed_link_is_listed_by_default() {
    let mut store = ReportStore::default();
    store.visit_test_result(
        with_steps("t", vec![attachment_ref("screen", Some("image/png"))]),
        &ctx(),
    );
    store
        .visit_attachment_file(&BufferResultFile::new("screen", vec![0_u8, 1, 2]), &ctx())
        .expect("buffer read");
    let listed = store.all_attachments(AttachmentFilter::default());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content_type, "image/png");
    assert_eq!(listed[0].ext, ".png");
    assert_eq!(listed[0].content_length, Some(3));
    assert_eq!(listed[0].name, "screen (exposed)");
}

#[test]
fn unknown_bytes_fall_back_to_binary() {
    let mut store = ReportStore::default();
    let id = store
        .visit_attachment_file(&BufferResultFile::new("dump", vec![0_u8, 0xff, 0]), &ctx())
        .expect("buffer read");
    let record = store.attachment_by_id(&id).expect("record");
    assert_eq!(record.content_type, GENERIC_BINARY_CONTENT_TYPE);
    assert_eq!(record.ext, "");
}

fn arbitrary_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(b"\x89PNG\r\n\x1a\n....".to_vec()),
        Just(b"plain words".to_vec()),
        Just(b"<html><body></body></html>".to_vec()),
        prop::collection::vec(any::<u8>(), 0..32),
    ]
}

fn file_names() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("shot.png".to_owned()),
        Just("log.txt".to_owned()),
        Just("report".to_owned()),
        Just("data.json".to_owned()),
        Just("archive.bin".to_owned()),
    ]
}

fn declared_types() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("image/png".to_owned())),
        Just(Some("text/csv".to_owned())),
    ]
}

proptest! {
    #[test]
    fn link_and_file_arrival_order_does_not_matter(
        file in file_names(),
        link_type in declared_types(),
        file_type in declared_types(),
        bytes in arbitrary_bytes(),
    ) {
        let link_step = || vec![attachment_ref(&file, link_type.as_deref())];
        let result_file = || {
            let buffer = BufferResultFile::new(file.clone(), bytes.clone());
            match &file_type {
                Some(content_type) => buffer.with_content_type(content_type.clone()),
                None => buffer,
            }
        };

        let mut link_first = ReportStore::default();
        link_first.visit_test_result(with_steps("t", link_step()), &ctx());
        let id = link_first.visit_attachment_file(&result_file(), &ctx()).expect("read");

        let mut file_first = ReportStore::default();
        file_first.visit_attachment_file(&result_file(), &ctx()).expect("read");
        file_first.visit_test_result(with_steps("t", link_step()), &ctx());

        prop_assert_eq!(link_first.attachment_by_id(&id), file_first.attachment_by_id(&id));
        let record = link_first.attachment_by_id(&id).expect("record");
        prop_assert!(record.used && !record.missed);
        if let Some(link_type) = &link_type {
            prop_assert_eq!(&record.content_type, link_type);
        }
    }
}
