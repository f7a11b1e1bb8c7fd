use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use canteiro_server::{build_router, config::Config, db::Database, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    // Held so uploads have somewhere to land for the whole test
    _storage: TempDir,
}

async fn test_app() -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let config = Config::for_tests(storage.path().to_str().unwrap());
    let db = Database::connect(&config.database_url).await.unwrap();
    db.run_migrations().await.unwrap();

    let state = AppState::new(db, config);
    state.storage.init().await.unwrap();

    TestApp {
        router: build_router(state),
        _storage: storage,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, email: &str, name: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "name": name, "password": "senha-forte-123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// A two-unit floor plus a garage, with one structural phase.
    async fn create_project(&self, token: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/projects",
                Some(token),
                Some(json!({
                    "name": "Residencial Aurora",
                    "address": "Rua das Flores, 100",
                    "structure": {
                        "floors": [
                            {
                                "id": "f1",
                                "label": "1º andar",
                                "units": [
                                    { "id": "101", "label": "101", "kind": "apartment" },
                                    { "id": "102", "label": "102", "kind": "apartment" }
                                ]
                            },
                            {
                                "id": "g1",
                                "label": "Garagem",
                                "units": [
                                    { "id": "g-01", "label": "Vaga 1", "kind": "garage" }
                                ],
                                "phaseIds": ["finishing"]
                            }
                        ]
                    },
                    "phases": [
                        { "id": "structure", "name": "Estrutura", "color": "#64748b" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create project failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_check_is_public() {
    let app = test_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = test_app().await;
    let (status, _) = app.send("GET", "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn new_user_sees_no_projects() {
    let app = test_app().await;
    let token = app.register("novo@example.com", "Novo").await;

    let (status, body) = app.send("GET", "/api/projects", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, session) = app.send("GET", "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["profile"]["email"], "novo@example.com");
    assert_eq!(session["projects"], json!([]));
    assert_eq!(session["organizations"], json!([]));
}

#[tokio::test]
async fn invited_guest_claims_and_sees_only_their_unit() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/projects/{project_id}/permissions"),
            Some(&owner),
            Some(json!({ "unitId": "101", "email": "Cliente@Example.com", "role": "client" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let guest = app.register("cliente@example.com", "Cliente").await;

    // First access links the invite to the new account
    let (status, access) = app
        .send("GET", &format!("/api/projects/{project_id}/access"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(access["level"], "guest");
    assert_eq!(access["role"], "client");
    assert_eq!(access["unitIds"], json!(["101"]));

    let (status, outcome) = app
        .send("POST", &format!("/api/projects/{project_id}/claim"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "alreadyClaimed");

    let (_, projects) = app.send("GET", "/api/projects", Some(&guest), None).await;
    assert_eq!(projects.as_array().unwrap().len(), 1);
    assert_eq!(projects[0]["access"]["level"], "guest");

    // Guests read but never write
    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/projects/{project_id}/progress"),
            Some(&guest),
            Some(json!({ "unitId": "101", "phaseId": "structure", "percentage": 50 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("GET", &format!("/api/projects/{project_id}/dashboard"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, customer) = app
        .send(
            "GET",
            &format!("/api/projects/{project_id}/customer-dashboard"),
            Some(&guest),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let units = customer["units"].as_array().unwrap();
    assert!(units.iter().all(|u| u["unitId"] == "101"));
}

#[tokio::test]
async fn outsiders_cannot_tell_a_project_exists() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let stranger = app.register("outro@example.com", "Outro").await;

    let (status, _) = app
        .send("GET", &format!("/api/projects/{project_id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("DELETE", &format!("/api/projects/{project_id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn task_progress_sets_status_and_mirrors_unit_progress() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;

    let (status, task) = app
        .send(
            "POST",
            &format!("/api/projects/{project_id}/tasks"),
            Some(&owner),
            Some(json!({
                "name": "Laje 101",
                "startDate": "2024-05-01",
                "endDate": "2024-05-10",
                "unitId": "101",
                "phaseId": "structure",
                "subtasks": [{ "id": "s1", "name": "Formas", "done": true }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{task}");
    assert_eq!(task["status"], "NOT_STARTED");
    let task_id = task["id"].as_str().unwrap();

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/api/projects/{project_id}/tasks/{task_id}"),
            Some(&owner),
            Some(json!({ "progress": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "COMPLETED");

    let (_, progress) = app
        .send("GET", &format!("/api/projects/{project_id}/progress"), Some(&owner), None)
        .await;
    let rows = progress["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["unitId"], "101");
    assert_eq!(rows[0]["phaseId"], "structure");
    assert_eq!(rows[0]["percentage"], 100.0);
    assert_eq!(rows[0]["subtasks"][0]["name"], "Formas");

    let (_, updated) = app
        .send(
            "PUT",
            &format!("/api/projects/{project_id}/tasks/{task_id}"),
            Some(&owner),
            Some(json!({ "progress": 0 })),
        )
        .await;
    assert_eq!(updated["status"], "NOT_STARTED");
}

#[tokio::test]
async fn relinking_a_task_keeps_the_previous_unit_row() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;

    let (_, task) = app
        .send(
            "POST",
            &format!("/api/projects/{project_id}/tasks"),
            Some(&owner),
            Some(json!({
                "name": "Reboco",
                "startDate": "2024-05-01",
                "endDate": "2024-05-10",
                "unitId": "101",
                "phaseId": "structure",
                "progress": 60
            })),
        )
        .await;
    let task_uri = format!("/api/projects/{project_id}/tasks/{}", task["id"].as_str().unwrap());

    let (status, _) = app
        .send(
            "PUT",
            &task_uri,
            Some(&owner),
            Some(json!({ "unitId": "102", "progress": 20 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, progress) = app
        .send("GET", &format!("/api/projects/{project_id}/progress"), Some(&owner), None)
        .await;
    let percentage = |unit: &str| {
        progress["rows"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["unitId"] == unit)
            .map(|r| r["percentage"].clone())
    };
    assert_eq!(percentage("101"), Some(json!(60.0)));
    assert_eq!(percentage("102"), Some(json!(20.0)));
}

#[tokio::test]
async fn explicit_status_cannot_contradict_progress() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;

    let (_, task) = app
        .send(
            "POST",
            &format!("/api/projects/{project_id}/tasks"),
            Some(&owner),
            Some(json!({
                "name": "Laje",
                "startDate": "2024-05-01",
                "endDate": "2024-05-10",
                "progress": 30
            })),
        )
        .await;
    assert_eq!(task["status"], "IN_PROGRESS");
    let task_uri = format!("/api/projects/{project_id}/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = app
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "status": "COMPLETED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = app
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "status": "NOT_STARTED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, insight) = app
        .send(
            "GET",
            &format!("/api/projects/{project_id}/insights?year=2024&month=5"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(insight["completedMilestones"], json!([]));

    let (status, delayed) = app
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "status": "DELAYED" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delayed["status"], "DELAYED");
    assert_eq!(delayed["progress"], 30);

    let (status, cleared) = app
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "status": "IN_PROGRESS" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn out_of_range_task_dates_are_rejected() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let tasks_uri = format!("/api/projects/{project_id}/tasks");

    let (status, _) = app
        .send(
            "POST",
            &tasks_uri,
            Some(&owner),
            Some(json!({ "name": "Fundação", "startDate": "+262142-12-30", "endDate": "+262142-12-31" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, task) = app
        .send(
            "POST",
            &tasks_uri,
            Some(&owner),
            Some(json!({ "name": "Fundação", "startDate": "2024-05-01", "endDate": "2024-05-03" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(
            "PUT",
            &format!("{tasks_uri}/{}", task["id"].as_str().unwrap()),
            Some(&owner),
            Some(json!({ "endDate": "2099-01-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, gantt) = app
        .send("GET", &format!("/api/projects/{project_id}/gantt"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gantt["bars"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn task_links_are_validated() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/tasks");

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&owner),
            Some(json!({ "name": "Invertida", "startDate": "2024-05-10", "endDate": "2024-05-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&owner),
            Some(json!({
                "name": "Sem unidade",
                "startDate": "2024-05-01",
                "endDate": "2024-05-02",
                "unitId": "999"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&owner),
            Some(json!({
                "name": "Dependência fantasma",
                "startDate": "2024-05-01",
                "endDate": "2024-05-02",
                "dependencies": ["missing"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overlapping_tasks_on_one_unit_are_flagged() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/tasks");

    for (name, unit, start, end) in [
        ("Alvenaria", "101", "2024-05-01", "2024-05-10"),
        ("Elétrica", "101", "2024-05-10", "2024-05-15"),
        ("Pintura", "102", "2024-05-01", "2024-05-10"),
    ] {
        let (status, _) = app
            .send(
                "POST",
                &uri,
                Some(&owner),
                Some(json!({ "name": name, "startDate": start, "endDate": end, "unitId": unit })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, tasks) = app.send("GET", &uri, Some(&owner), None).await;
    let conflict_of = |name: &str| {
        tasks
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == name)
            .map(|t| t["conflict"].clone())
            .unwrap()
    };
    assert_eq!(conflict_of("Alvenaria"), json!(true));
    assert_eq!(conflict_of("Elétrica"), json!(true));
    assert_eq!(conflict_of("Pintura"), json!(false));

    let (_, dashboard) = app
        .send("GET", &format!("/api/projects/{project_id}/dashboard"), Some(&owner), None)
        .await;
    assert_eq!(dashboard["tasks"]["total"], 3);
    assert_eq!(dashboard["tasks"]["conflicts"], 2);
}

#[tokio::test]
async fn dashboard_rolls_up_floor_progress() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/progress");

    for (unit, percentage) in [("101", 100), ("102", 40)] {
        let (status, _) = app
            .send(
                "PUT",
                &uri,
                Some(&owner),
                Some(json!({ "unitId": unit, "phaseId": "structure", "percentage": percentage })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, dashboard) = app
        .send("GET", &format!("/api/projects/{project_id}/dashboard"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let building = &dashboard["building"];
    assert_eq!(building["overall"], 70);
    let phase = &building["phases"][0];
    assert_eq!(phase["average"], 70);
    // The garage floor only takes finishing work
    assert_eq!(phase["applicableFloors"], 1);
    assert_eq!(phase["floors"][0]["state"], "active");
    assert_eq!(phase["floors"][0]["average"], 70);
    assert_eq!(phase["completedFloors"], 0);

    let (status, _) = app
        .send(
            "PUT",
            &uri,
            Some(&owner),
            Some(json!({ "unitId": "101", "phaseId": "structure", "percentage": 120 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn monthly_insight_counts_reports() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/reports");

    for (date, weather, workforce, observations) in [
        ("2024-05-02", "storm", 10, "Temporal à tarde, concretagem adiada"),
        ("2024-05-03", "sunny", 14, "Concluída a concretagem da laje do 1º andar"),
        ("2024-06-01", "storm", 3, ""),
    ] {
        let (status, body) = app
            .send(
                "POST",
                &uri,
                Some(&owner),
                Some(json!({
                    "reportDate": date,
                    "weather": weather,
                    "workforce": workforce,
                    "observations": observations
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, insight) = app
        .send(
            "GET",
            &format!("/api/projects/{project_id}/insights?year=2024&month=5"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["workDays"], 2);
    assert_eq!(insight["rainyDays"], 1);
    assert_eq!(insight["avgWorkforce"], 12);
    assert_eq!(insight["notableObservations"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(
            "GET",
            &format!("/api/projects/{project_id}/insights?year=2024&month=13"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn one_report_per_project_day() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/reports");

    for workforce in [8, 11] {
        let (status, _) = app
            .send(
                "POST",
                &uri,
                Some(&owner),
                Some(json!({ "reportDate": "2024-05-02", "weather": "cloudy", "workforce": workforce })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, reports) = app
        .send("GET", &format!("{uri}?from=2024-05-01&to=2024-05-31"), Some(&owner), None)
        .await;
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["workforce"], 11);

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&owner),
            Some(json!({ "reportDate": "2024-05-03", "weather": "foggy", "workforce": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_are_listed_with_replies() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;
    let uri = format!("/api/projects/{project_id}/notes");

    let (_, note) = app
        .send("POST", &uri, Some(&owner), Some(json!({ "content": "Conferir prumo" })))
        .await;
    let note_id = note["id"].as_str().unwrap();
    assert_eq!(note["context"], "general");

    let (status, _) = app
        .send(
            "POST",
            &format!("{uri}/{note_id}/replies"),
            Some(&owner),
            Some(json!({ "content": "Conferido" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, notes) = app.send("GET", &uri, Some(&owner), None).await;
    assert_eq!(notes[0]["replies"][0]["content"], "Conferido");
    assert_eq!(notes[0]["replies"][0]["authorName"], "Dono");
}

#[tokio::test]
async fn ai_endpoints_report_missing_configuration() {
    let app = test_app().await;
    let token = app.register("dono@example.com", "Dono").await;

    let (status, body) = app
        .send("POST", "/api/ai/summarize", Some(&token), Some(json!({ "text": "Dia produtivo" })))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn organization_members_see_org_projects_as_staff() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let engineer = app.register("eng@example.com", "Engenheira").await;

    let (_, org) = app
        .send("POST", "/api/organizations", Some(&owner), Some(json!({ "name": "Construtora X" })))
        .await;
    let org_id = org["id"].as_str().unwrap();

    let (_, invite) = app
        .send(
            "POST",
            &format!("/api/organizations/{org_id}/invites"),
            Some(&owner),
            Some(json!({ "email": "eng@example.com" })),
        )
        .await;
    let invite_id = invite["id"].as_str().unwrap();

    let (_, session) = app.send("GET", "/api/session", Some(&engineer), None).await;
    assert_eq!(session["pendingInvites"][0]["id"], invite_id);

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/organizations/{org_id}/invites/{invite_id}/accept"),
            Some(&engineer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, project) = app
        .send(
            "POST",
            "/api/projects",
            Some(&owner),
            Some(json!({ "name": "Torre B", "organizationId": org_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let project_id = project["id"].as_str().unwrap();

    let (status, access) = app
        .send("GET", &format!("/api/projects/{project_id}/access"), Some(&engineer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(access["level"], "staff");
    assert_eq!(access["isOrgMember"], true);
}

#[tokio::test]
async fn calendar_places_reports_and_flags_missing_weekdays() {
    let app = test_app().await;
    let owner = app.register("dono@example.com", "Dono").await;
    let project_id = app.create_project(&owner).await;

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/projects/{project_id}/reports"),
            Some(&owner),
            Some(json!({ "reportDate": "2024-05-02", "weather": "sunny", "workforce": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, calendar) = app
        .send(
            "GET",
            &format!("/api/projects/{project_id}/calendar?year=2024&month=5"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // May 2024 starts on a Wednesday
    assert_eq!(calendar["weeks"][0], json!([null, null, null, "2024-05-01", "2024-05-02", "2024-05-03", "2024-05-04"]));
    assert_eq!(calendar["reports"]["2024-05-02"]["workforce"], 9);

    let missing: Vec<&str> = calendar["missingReports"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(missing.contains(&"2024-05-01"));
    assert!(!missing.contains(&"2024-05-02"));
    assert!(!missing.contains(&"2024-05-04"));
}
