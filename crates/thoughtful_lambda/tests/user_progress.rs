mod support;

use std::collections::BTreeMap;

use serde_json::{json, Value};
use thoughtful_core::apigw::ApiGatewayResponse;
use thoughtful_core::models::progress::UserUnitProgress;
use thoughtful_lambda::handlers::user_progress::{
    handle_user_progress_event, UserProgressDependencies,
};

use support::{api_event, noon, MemoryFirstSolutions, MemoryProgress};

const NOON_ISO: &str = "2025-03-10T12:00:00.000000Z";
const NEW_YEAR: &str = "2025-01-01T00:00:00.000000Z";

#[derive(Default)]
struct Harness {
    progress: MemoryProgress,
    first_solutions: MemoryFirstSolutions,
}

impl Harness {
    fn deps(&self) -> UserProgressDependencies<'_> {
        UserProgressDependencies {
            progress: &self.progress,
            first_solutions: &self.first_solutions,
        }
    }

    fn seed_unit(&self, unit: &str, lesson: &str, section: &str, at: &str) {
        self.progress.seed(completed(unit, lesson, section, at));
    }

    fn handle(&self, event: &Value) -> ApiGatewayResponse {
        handle_user_progress_event(event, &self.deps(), noon())
    }

    /// Sends the request as the signed-in student `alice`.
    fn request(&self, method: &str, path: &str, body: Option<Value>) -> ApiGatewayResponse {
        self.handle(&api_event(method, path, Some("alice"), body))
    }
}

fn completed(unit: &str, lesson: &str, section: &str, at: &str) -> UserUnitProgress {
    UserUnitProgress {
        user_id: "alice".to_string(),
        unit_id: unit.to_string(),
        completion: BTreeMap::from([(
            lesson.to_string(),
            BTreeMap::from([(section.to_string(), at.to_string())]),
        )]),
    }
}

#[test]
fn anonymous_request_is_unauthorized() {
    let harness = Harness::default();
    let response = harness.handle(&api_event("GET", "/progress", None, None));
    assert_eq!(response.status_code, 401);
}

#[test]
fn get_progress_aggregates_units() {
    let harness = Harness::default();
    let second_day = "2025-01-02T00:00:00.000000Z";
    harness.seed_unit("unit-1", "l1", "s1", NEW_YEAR);
    harness.seed_unit("unit-2", "l9", "s3", second_day);

    let response = harness.request("GET", "/progress", None);

    assert_eq!(response.status_code, 200);
    let body = response.json_body();
    let completion = &body["completion"];
    assert_eq!(body["userId"], "alice");
    assert_eq!(completion["unit-1"]["l1"]["s1"], NEW_YEAR);
    assert_eq!(completion["unit-2"]["l9"]["s3"], second_day);
}

#[test]
fn put_progress_keeps_first_completion_time() {
    let harness = Harness::default();
    harness.seed_unit("unit-1", "l1", "s1", NEW_YEAR);

    let body = json!({
        "completions": [
            { "unitId": "unit-1", "lessonId": "l1", "sectionId": "s1" },
            { "unitId": "unit-1", "lessonId": "l1", "sectionId": "s2" },
            { "unitId": "unit-3", "lessonId": "l4", "sectionId": "s1" },
        ]
    });
    let response = harness.request("PUT", "/progress", Some(body));

    assert_eq!(response.status_code, 200);
    let body = response.json_body();
    let completion = &body["completion"];
    assert_eq!(completion["unit-1"]["l1"]["s1"], NEW_YEAR);
    assert_eq!(completion["unit-1"]["l1"]["s2"], NOON_ISO);
    assert_eq!(completion["unit-3"]["l4"]["s1"], NOON_ISO);
}

#[test]
fn put_progress_skips_write_when_nothing_is_new() {
    let harness = Harness::default();
    harness.seed_unit("unit-1", "l1", "s1", NEW_YEAR);

    let body = json!({
        "completions": [{ "unitId": "unit-1", "lessonId": "l1", "sectionId": "s1" }]
    });
    let response = harness.request("PUT", "/progress", Some(body));

    assert_eq!(response.status_code, 200);
    assert_eq!(*harness.progress.puts.lock().unwrap(), 0);
}

#[test]
fn put_progress_with_empty_batch_returns_current_progress() {
    let harness = Harness::default();
    let body = json!({ "completions": [] });
    let response = harness.request("PUT", "/progress", Some(body));

    assert_eq!(response.status_code, 200);
    assert_eq!(response.json_body()["completion"], json!({}));
}

#[test]
fn put_progress_rejects_malformed_body() {
    let harness = Harness::default();
    let body = json!({ "completions": "all" });
    let response = harness.request("PUT", "/progress", Some(body));
    assert_eq!(response.status_code, 400);
}

#[test]
fn first_solution_is_recorded_once() {
    let harness = Harness::default();
    let body = json!({
        "unitId": "unit-1",
        "lessonId": "l1",
        "sectionId": "quiz",
        "solution": "B",
        "questionType": "multiple-choice",
    });

    let first = harness.request("POST", "/first-solutions", Some(body.clone()));
    assert_eq!(first.status_code, 201);
    let first_body = first.json_body();
    let submission = &first_body["submission"];
    assert_eq!(first_body["recorded"], true);
    assert_eq!(submission["sectionCompositeKey"], "unit-1#l1#quiz");
    assert_eq!(submission["submittedAt"], NOON_ISO);

    let retry = harness.request("POST", "/first-solutions", Some(body));
    assert_eq!(retry.status_code, 200);
    assert_eq!(retry.json_body()["recorded"], false);
}

#[test]
fn oversized_first_solution_is_rejected() {
    let harness = Harness::default();
    let body = json!({
        "unitId": "unit-1",
        "lessonId": "l1",
        "sectionId": "quiz",
        "solution": "x".repeat(1001),
        "questionType": "text",
    });
    let response = harness.request("POST", "/first-solutions", Some(body));

    assert_eq!(response.status_code, 400);
    assert!(harness.first_solutions.items.lock().unwrap().is_empty());
}

#[test]
fn unknown_route_is_not_found() {
    let harness = Harness::default();
    let response = harness.request("DELETE", "/progress", None);
    assert_eq!(response.status_code, 404);
}
