//! MockMonitor tests: the in-memory engine behaves like the real one.
//! Run with: cargo test --features test-utils --test mocks

#![cfg(feature = "test-utils")]

use cairn0::test_utils::{EchoMocks, MockMonitor, RecordingLog};
use cairn0::*;
use std::collections::BTreeMap;

fn inputs() -> PropertyBag {
    BTreeMap::from([("size".to_owned(), WireValue::from(3_i64))])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MockMonitor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn custom_resource_gets_echoed_state_and_id() {
    let monitor = MockMonitor::new(EchoMocks::new(), "web", "dev");
    let mut request = RegisterResourceRequest::new("aws:s3:Bucket", "logs", true);
    request.properties = inputs();

    let response = monitor.register_resource(request).await.unwrap();
    assert_eq!(response.urn.as_str(), "urn:cairn:dev::web::aws:s3:Bucket::logs");
    assert_eq!(response.id, Some(ResourceId::new("logs_id")));
    assert_eq!(response.properties, inputs());
    assert_eq!(monitor.registration_count("logs"), 1);
}

#[tokio::test]
async fn preview_withholds_ids() {
    let monitor = MockMonitor::new(EchoMocks::new(), "web", "dev").with_dry_run(true);
    let response = monitor
        .register_resource(RegisterResourceRequest::new("aws:s3:Bucket", "logs", true))
        .await
        .unwrap();
    assert_eq!(response.id, None);
}

#[tokio::test]
async fn components_never_reach_the_mocks() {
    let mocks = EchoMocks::new().with_failure("svc", "should not be called");
    let monitor = MockMonitor::new(mocks, "web", "dev");
    let response = monitor
        .register_resource(RegisterResourceRequest::new("my:app:Service", "svc", false))
        .await
        .unwrap();
    assert_eq!(response.id, None);
}

#[tokio::test]
async fn scripted_failure_is_a_provider_error() {
    let monitor = MockMonitor::new(EchoMocks::new().with_failure("logs", "quota exceeded"), "web", "dev");
    let err = monitor
        .register_resource(RegisterResourceRequest::new("aws:s3:Bucket", "logs", true))
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::Provider(ref m) if m == "quota exceeded"));
}

#[tokio::test]
async fn invoke_echoes_args_and_is_recorded() {
    let monitor = MockMonitor::new(EchoMocks::new(), "web", "dev");
    let result = monitor
        .invoke(InvokeRequest::new("aws:ec2:getAmi", inputs()))
        .await
        .unwrap();
    assert_eq!(result, inputs());
    assert_eq!(monitor.invokes().len(), 1);
    assert_eq!(monitor.invokes()[0].token, "aws:ec2:getAmi");
}

#[tokio::test]
async fn resource_outputs_are_kept_by_urn() {
    let monitor = MockMonitor::new(EchoMocks::new(), "web", "dev");
    let urn = Urn::new("urn:cairn:dev::web::cairn:cairn:Stack::web-dev");
    monitor.register_resource_outputs(&urn, inputs()).await.unwrap();
    assert_eq!(monitor.resource_outputs()[&urn], inputs());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordingLog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn recording_log_keeps_entries_in_order() {
    let log = RecordingLog::new();
    log.info("registering", None);
    log.warn("slow provider", None);
    log.info("registered", None);

    let entries = log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].message, "slow provider");
    assert_eq!(log.at(Severity::Info).len(), 2);
}
