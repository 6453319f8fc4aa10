//! # API Contract Tests
//!
//! Exercises every endpoint's error surface — authentication (401),
//! authorization (403), not found (404), workflow/version conflicts
//! (409), validation (422) — plus the happy-path lifecycle end to end
//! over the assembled router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use isps_api::state::{AppConfig, AppState};

/// Build a test app with auth disabled.
fn test_app() -> axum::Router {
    isps_api::app(AppState::new())
}

/// Build a test app with bearer-token auth enabled.
fn authed_app(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    isps_api::app(AppState::with_config(config))
}

/// Read a response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Request builder with JSON body and actor headers.
fn json_request(method: &str, uri: &str, actor: Option<(&str, &str)>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// GET request builder.
fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// DELETE request builder with actor headers.
fn delete(uri: &str, actor: (&str, &str)) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("x-actor-id", actor.0)
        .header("x-actor-role", actor.1)
        .body(Body::empty())
        .unwrap()
}

fn creation_payload() -> Value {
    json!({
        "formation_type": "agent_surete_portuaire",
        "lieu": "Port Autonome, Môle 3",
        "centre_formation": "Centre de formation ISPS",
        "date_debut": "2026-04-06",
        "date_fin": "2026-04-10",
        "participants": [
            {"nom": "Diop", "prenom": "Awa"},
            {"nom": "Ndiaye", "prenom": "Moussa"}
        ]
    })
}

/// Create a formation as the RSO and return its response body.
async fn create_formation(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/formations",
            Some(("rso-1", "rso")),
            &creation_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Drive a formation to EXAM_COMPLETED with a supervision report.
async fn drive_to_graded(app: &axum::Router) -> (String, Vec<String>) {
    let created = create_formation(app).await;
    let id = created["id"].as_str().unwrap().to_string();
    let participant_ids: Vec<String> = created["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();

    for (uri, body, actor) in [
        (
            format!("/v1/formations/{id}/validate"),
            json!({"url_sujet_examen": "docs/sujet.pdf"}),
            ("chef-1", "chef_surete"),
        ),
        (
            format!("/v1/formations/{id}/exam/start"),
            json!({}),
            ("chef-1", "chef_surete"),
        ),
        (
            format!("/v1/formations/{id}/exam/end"),
            json!({}),
            ("chef-1", "chef_surete"),
        ),
        (
            format!("/v1/formations/{id}/supervision-report"),
            json!({
                "observations_generales": "Session conforme.",
                "conformite_contenu": true,
                "apte_examen": true
            }),
            ("chef-1", "chef_surete"),
        ),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", &uri, Some(actor), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "step {uri} failed");
    }

    let grades = json!({
        "grades": [
            {"participant_id": participant_ids[0], "note": 12.0},
            {"participant_id": participant_ids[1], "note": 8.0}
        ]
    });
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/grades"),
            Some(("chef-1", "chef_surete")),
            &grades,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "AWAITING_DIRECTOR_VALIDATION");

    (id, participant_ids)
}

// ---------------------------------------------------------------------------
// Health and docs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn liveness_always_ok() {
    let response = test_app().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_reports_ready() {
    let response = test_app().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_served() {
    let response = test_app().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/v1/formations"].is_object());
}

#[tokio::test]
async fn metrics_exposition() {
    let app = test_app();
    // One API request so the HTTP counters have a labeled sample.
    let _ = app.clone().oneshot(get("/v1/formations")).await.unwrap();
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("isps_http_requests_total"));
    assert!(text.contains("isps_diplomas_issued_total"));
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_401() {
    let app = authed_app("secret-token");
    let response = app.oneshot(get("/v1/formations")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_is_401() {
    let app = authed_app("secret-token");
    let request = Request::builder()
        .uri("/v1/formations")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_token_passes() {
    let app = authed_app("secret-token");
    let request = Request::builder()
        .uri("/v1/formations")
        .header("authorization", "Bearer secret-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_and_verification_skip_auth() {
    let app = authed_app("secret-token");
    let response = app
        .clone()
        .oneshot(get("/health/liveness"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/verification/ISPS-000001-aaaaaaaa-bbbbbbbb"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_formation_as_rso() {
    let app = test_app();
    let body = create_formation(&app).await;
    assert_eq!(body["status"], "PENDING_VALIDATION");
    assert_eq!(body["version"], 1);
    assert_eq!(body["rso"], "rso-1");
    assert_eq!(body["participants"].as_array().unwrap().len(), 2);
    assert_eq!(body["participants"][0]["statut"], "pending");
}

#[tokio::test]
async fn create_without_actor_headers_is_401() {
    let app = test_app();
    let response = app
        .oneshot(json_request("POST", "/v1/formations", None, &creation_payload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_with_wrong_role_is_403() {
    let app = test_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/formations",
            Some(("chef-1", "chef_surete")),
            &creation_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_with_blank_lieu_is_422() {
    let app = test_app();
    let mut payload = creation_payload();
    payload["lieu"] = json!("   ");
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/formations",
            Some(("rso-1", "rso")),
            &payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_with_inverted_dates_is_422() {
    let app = test_app();
    let mut payload = creation_payload();
    payload["date_debut"] = json!("2026-04-10");
    payload["date_fin"] = json!("2026-04-06");
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/formations",
            Some(("rso-1", "rso")),
            &payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_json_is_422() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/formations")
        .header("content-type", "application/json")
        .header("x-actor-id", "rso-1")
        .header("x-actor-role", "rso")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn get_unknown_formation_is_404() {
    let app = test_app();
    let response = app
        .oneshot(get(&format!("/v1/formations/{}", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Workflow actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validate_by_rso_is_403() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/validate"),
            Some(("rso-1", "rso")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn reject_records_motif_and_blocks_further_actions() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/reject"),
            Some(("dsm-1", "dsm")),
            &json!({"motif": "dossier incomplet"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["motif_rejet"], "dossier incomplet");

    // A rejected formation refuses every subsequent action with 409.
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/exam/start"),
            Some(("chef-1", "chef_surete")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn reject_with_empty_motif_is_422_for_any_role() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    // The payload check runs at the boundary, before role evaluation.
    for role in ["chef_surete", "dsm", "rso", "dg"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/v1/formations/{id}/reject"),
                Some(("someone", role)),
                &json!({"motif": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "role {role} should get a validation error"
        );
    }
}

#[tokio::test]
async fn grades_before_report_is_409() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap().to_string();
    let participant = created["participants"][0]["id"].as_str().unwrap();

    for (uri, body) in [
        (format!("/v1/formations/{id}/validate"), json!({})),
        (format!("/v1/formations/{id}/exam/start"), json!({})),
        (format!("/v1/formations/{id}/exam/end"), json!({})),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", &uri, Some(("chef-1", "chef_surete")), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/grades"),
            Some(("chef-1", "chef_surete")),
            &json!({"grades": [{"participant_id": participant, "note": 12.0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("supervision report"));
}

#[tokio::test]
async fn grade_for_unknown_participant_is_404() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap().to_string();

    for (uri, body) in [
        (format!("/v1/formations/{id}/validate"), json!({})),
        (format!("/v1/formations/{id}/exam/start"), json!({})),
        (format!("/v1/formations/{id}/exam/end"), json!({})),
        (
            format!("/v1/formations/{id}/supervision-report"),
            json!({"observations_generales": "ok", "apte_examen": true}),
        ),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", &uri, Some(("chef-1", "chef_surete")), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/grades"),
            Some(("chef-1", "chef_surete")),
            &json!({"grades": [{"participant_id": uuid::Uuid::new_v4(), "note": 12.0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn out_of_range_note_is_422() {
    let app = test_app();
    let (id, participants) = drive_to_graded(&app).await;
    // Already graded; but validation runs before the state check, so an
    // out-of-range note reports 422 rather than 409.
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/grades"),
            Some(("chef-1", "chef_surete")),
            &json!({"grades": [{"participant_id": participants[0], "note": 21.0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stale_version_is_409() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    // First action with the current version succeeds and bumps it.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/validate"),
            Some(("chef-1", "chef_surete")),
            &json!({"expected_version": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], 2);

    // A second caller still holding version 1 loses the race.
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/exam/start"),
            Some(("dsm-1", "dsm")),
            &json!({"expected_version": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("refetch"));
}

// ---------------------------------------------------------------------------
// Deletion guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_pending_formation_as_admin() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(delete(
            &format!("/v1/formations/{id}"),
            ("admin-1", "super_admin"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/v1/formations/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_by_non_admin_is_403() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(delete(&format!("/v1/formations/{id}"), ("rso-1", "rso")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_mid_workflow_is_409() {
    let app = test_app();
    let created = create_formation(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/validate"),
            Some(("chef-1", "chef_surete")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(delete(&format!("/v1/formations/{id}"), ("admin-1", "admin")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Full lifecycle with issuance and public verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_to_verified_diploma() {
    let app = test_app();
    let (id, participants) = drive_to_graded(&app).await;

    // Only the director-general may issue.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/diplomas/issue"),
            Some(("chef-1", "chef_surete")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/diplomas/issue"),
            Some(("dg-1", "dg")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["formation"]["status"], "COMPLETED");
    let diplomas = body["diplomas"].as_array().unwrap();
    assert_eq!(diplomas.len(), 1);
    let numero = diplomas[0]["numero"].as_str().unwrap().to_string();
    assert!(numero.starts_with("ISPS-"));

    // The graded participants carry the right statuses.
    let formation = &body["formation"];
    let statuses: Vec<&str> = formation["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["statut"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"certified"));
    assert!(statuses.contains(&"failed"));

    // The first participant (12/20) was the certified one.
    let certified = formation["participants"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == participants[0].as_str())
        .unwrap();
    assert_eq!(certified["numero_diplome"], numero.as_str());

    // Public verification confirms the diploma without auth.
    let response = app
        .clone()
        .oneshot(get(&format!("/verification/{numero}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verification = body_json(response).await;
    assert_eq!(verification["valid"], true);
    assert_eq!(verification["diploma"]["numero"], numero.as_str());
    assert_eq!(verification["diploma"]["nom"], "Diop");

    // Unknown numbers answer valid: false.
    let response = app
        .clone()
        .oneshot(get("/verification/ISPS-999999-aaaaaaaa-bbbbbbbb"))
        .await
        .unwrap();
    let verification = body_json(response).await;
    assert_eq!(verification["valid"], false);
    assert!(verification["diploma"].is_null());

    // Terminal: a second issuance attempt conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/formations/{id}/diplomas/issue"),
            Some(("dg-1", "dg")),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The audit log covers the full path.
    let response = app
        .oneshot(get(&format!("/v1/formations/{id}/transitions")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let transitions = body_json(response).await;
    let log = transitions.as_array().unwrap();
    assert_eq!(log.len(), 5);
    assert_eq!(log[0]["from_status"], "PENDING_VALIDATION");
    assert_eq!(log[4]["to_status"], "COMPLETED");
    assert_eq!(log[4]["actor"], "dg-1");
}
