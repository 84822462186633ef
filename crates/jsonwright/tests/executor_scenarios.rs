//! End-to-end scenarios: documents on disk, run through the runner against
//! the in-memory driver.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use jsonwright::{
    CaseStatus, DynamicOptions, FunctionRegistry, MockDom, MockDriver, MockElement, MockFactory,
    NetworkResponse, RunReport, Runner, RunnerConfig,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_doc(dir: &Path, name: &str, doc: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    path
}

fn config() -> RunnerConfig {
    RunnerConfig::new()
        .with_base_url("http://app.test")
        .with_expect_timeout(Duration::from_millis(100))
        .with_slow_type_delay(Duration::ZERO)
        .with_dynamic(DynamicOptions::new().with_seed(11))
}

fn page() -> MockDom {
    MockDom::new()
        .child(
            MockElement::new("form")
                .id("signup")
                .child(MockElement::new("input").id("email"))
                .child(MockElement::new("input").id("user"))
                .child(MockElement::new("input").id("avatar").attr("type", "file"))
                .child(
                    MockElement::new("button")
                        .id("send")
                        .text("Send")
                        .navigates_to("http://app.test/#/ok"),
                ),
        )
        .child(
            MockElement::new("ul")
                .id("list")
                .child(MockElement::new("li").child(MockElement::new("span").text("one")))
                .child(MockElement::new("li").child(MockElement::new("span").text("two")))
                .child(MockElement::new("li").child(MockElement::new("span").text("three"))),
        )
        .child(MockElement::new("input").id("out"))
}

async fn run(config: RunnerConfig, factory: &Arc<MockFactory>, files: &[PathBuf]) -> RunReport {
    let functions = FunctionRegistry::new().with_value("token", "t-42");
    Runner::new(config, factory.clone())
        .with_functions(Arc::new(functions))
        .run_files(files)
        .await
}

fn factory() -> Arc<MockFactory> {
    Arc::new(MockFactory::new(MockDriver::new(page())))
}

#[tokio::test]
async fn signup_with_generated_email_lands_on_ok_route() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "signup.json",
        &json!({"describe": {
            "text": "Signup",
            "url": "",
            "fills": {
                "title": "fills and submits",
                "actions": [
                    {"type": "faker.internet.email()", "loc": "#email"},
                    {"click": "button > Send"},
                    {"expectUrl": {"contains": "#/ok"}}
                ]
            }
        }}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.suites[0].title, "Signup");
    let history = factory.driver().history();
    assert!(history.contains(&"navigate:http://app.test".to_string()));
    let fill = history.iter().find(|c| c.starts_with("fill:")).unwrap();
    assert!(fill.contains('@'), "{fill}");
}

#[tokio::test]
async fn empty_url_without_base_fails_the_case() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "nobase.json",
        &json!({"describe": {"open": {"url": "", "actions": [{"click": "#send"}]}}}),
    );
    let factory = factory();
    let config = RunnerConfig::new().with_expect_timeout(Duration::from_millis(50));

    let report = run(config, &factory, &[doc]).await;

    let case = &report.suites[0].cases[0];
    assert_eq!(case.status, CaseStatus::Failed);
    assert!(case.error.as_deref().unwrap().contains("No baseURL"));
    assert!(!factory.driver().was_called("click:"));
}

#[tokio::test]
async fn non_operation_action_passes_without_browser_calls() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "noop.json",
        &json!({"describe": {"idle": {"actions": [{"nth": 2, "within": "#list"}]}}}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert_eq!(report.passed(), 1);
    let history = factory.driver().history();
    assert!(history.iter().all(|c| c == "open" || c == "close"), "{history:?}");
}

#[tokio::test]
async fn exist_gate_skips_only_the_gated_action() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "gate.json",
        &json!({"describe": {"gated": {"actions": [
            {"exist": "#banner", "click": "#banner"},
            {"type": "after gate", "loc": "#out"}
        ]}}}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    assert!(!factory.driver().was_called("click:"));
    assert!(factory
        .driver()
        .history()
        .iter()
        .any(|c| c.starts_with("fill:") && c.ends_with("=after gate")));
}

#[tokio::test]
async fn for_each_shares_the_bag_across_items() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "items.json",
        &json!({"describe": {"walk": {"actions": [
            {"forEach": {"items": "#list li", "actions": [{"getText": "span"}]}},
            {"type": "{lastGetText}", "loc": "#out"}
        ]}}}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    let driver = factory.driver();
    assert_eq!(driver.call_count("scrollIntoView:"), 3);
    assert!(driver
        .history()
        .iter()
        .any(|c| c.starts_with("fill:") && c.ends_with("=three")));
}

#[tokio::test]
async fn before_cases_run_first_and_share_variables() {
    let dir = TempDir::new().unwrap();
    write_doc(
        dir.path(),
        "hooks/login.json",
        &json!({"describe": {"login": {"actions": [
            {"run": "token", "as": "tok"},
            {"type": "demo", "loc": "#user"}
        ]}}}),
    );
    let doc = write_doc(
        dir.path(),
        "specs/main.json",
        &json!({"describe": {
            "before": "../hooks/login.json",
            "uses": {"actions": [{"type": "{tok}", "loc": "#out"}]}
        }}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    let history = factory.driver().history();
    let user = history.iter().position(|c| c.ends_with("=demo")).unwrap();
    let out = history.iter().position(|c| c.ends_with("=t-42")).unwrap();
    assert!(user < out);
}

#[tokio::test]
async fn before_cycle_fails_suite_setup() {
    let dir = TempDir::new().unwrap();
    write_doc(
        dir.path(),
        "a.json",
        &json!({"describe": {"before": "b.json", "x": {"actions": []}}}),
    );
    write_doc(
        dir.path(),
        "b.json",
        &json!({"describe": {"before": "a.json", "y": {"actions": []}}}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[dir.path().join("a.json")]).await;

    assert!(!report.is_success());
    let error = report.suites[0].cases[0].error.clone().unwrap();
    assert!(error.contains("Cycle"), "{error}");
}

#[tokio::test]
async fn upload_resolves_against_document_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("avatar.png"), b"png").unwrap();
    let doc = write_doc(
        dir.path(),
        "upload.json",
        &json!({"describe": {"pick": {"actions": [
            {"upload": {"loc": "#avatar", "files": "avatar.png"}}
        ]}}}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    assert!(factory
        .driver()
        .history()
        .iter()
        .any(|c| c.starts_with("upload:") && c.ends_with("=1")));
}

#[tokio::test]
async fn wait_response_matches_captured_traffic() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "wait.json",
        &json!({"describe": {"api": {"actions": [
            {"click": "#send"},
            {"waitResponse": {"url": "**/api/users", "status": 201, "timeout": 200}}
        ]}}}),
    );
    let factory = factory();
    factory
        .driver()
        .push_response(NetworkResponse::new("http://app.test/api/users", 201));

    let report = run(config(), &factory, &[doc]).await;

    assert!(report.is_success(), "{report:?}");
    assert!(factory.driver().was_called("waitForResponse:"));
}

#[tokio::test]
async fn documents_run_in_order_and_failures_are_isolated() {
    let dir = TempDir::new().unwrap();
    let first = write_doc(
        dir.path(),
        "1-broken.json",
        &json!({"describe": {"bad": {"actions": [{"click": "#missing"}]}, "good": {"actions": []}}}),
    );
    let second = write_doc(dir.path(), "2-fine.json", &json!({"describe": {"ok": {}}}));
    let factory = factory();

    let report = run(config(), &factory, &[first, second]).await;

    assert_eq!(report.suites.len(), 2);
    assert_eq!(report.suites[0].title, "All Tests 01");
    assert_eq!(report.suites[1].title, "All Tests 02");
    assert_eq!(report.suites[0].failed(), 1);
    assert_eq!(report.suites[0].passed(), 1);
    assert!(report.suites[1].is_success());
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn out_of_range_date_fails_only_its_case() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        dir.path(),
        "dates.json",
        &json!({"describe": {
            "far": {"actions": [{"type": "date(today+99999999)", "loc": "#out"}]},
            "near": {"actions": [{"type": "date(today+1)", "loc": "#out"}]}
        }}),
    );
    let factory = factory();

    let report = run(config(), &factory, &[doc]).await;

    let cases = &report.suites[0].cases;
    assert_eq!(cases[0].status, CaseStatus::Failed);
    assert!(cases[0].error.as_deref().unwrap().contains("out of range"));
    assert_eq!(cases[1].status, CaseStatus::Passed);
}
