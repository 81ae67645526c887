use actix_web::{web, HttpResponse, Responder};
use common::utils::Category;
use progress::{Player, PreferencesUpdate, ProgressService, Submission};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{auth::AuthenticatedUser, metrics};

const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

pub struct AppState {
    pub service: ProgressService,
    pub auth_provider_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub time_spent: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    pub category: Option<Category>,
}

fn something_went_wrong(operation: &str) -> HttpResponse {
    metrics::record_failure(operation);
    HttpResponse::InternalServerError().json(json!({ "error": GENERIC_ERROR }))
}

/// Username for a profile created on first access: the local part of the
/// session email.
fn username_from_email(email: Option<&str>) -> Option<String> {
    email
        .and_then(|email| email.split('@').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[actix_web::get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[actix_web::get("/metrics")]
async fn metrics_endpoint() -> impl Responder {
    match metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!("Error rendering metrics: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[actix_web::get("/challenges")]
async fn list_challenges(
    query: web::Query<ChallengeQuery>,
    app_state: web::Data<AppState>,
) -> impl Responder {
    let AppState { service, .. } = &**app_state;

    match service.list_challenges(query.category).await {
        Some(challenges) => HttpResponse::Ok().json(challenges),
        None => something_went_wrong("list_challenges"),
    }
}

#[actix_web::get("/challenges/daily")]
async fn daily_challenge(app_state: web::Data<AppState>) -> impl Responder {
    let AppState { service, .. } = &**app_state;
    metrics::DAILY_CHALLENGE_SERVED.inc();

    match service.get_daily_challenge().await {
        Some(challenge) => HttpResponse::Ok().json(challenge),
        None => HttpResponse::NotFound().json(json!({ "error": "No daily challenge available" })),
    }
}

#[actix_web::post("/challenges/{id}/submit")]
async fn submit_answer(
    path: web::Path<i32>,
    req: web::Json<SubmitAnswerRequest>,
    user: Option<AuthenticatedUser>,
    app_state: web::Data<AppState>,
) -> impl Responder {
    if let Err(e) = req.validate() {
        return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
    }
    let AppState { service, .. } = &**app_state;
    let challenge_id = path.into_inner();
    let player = user.map(|u| {
        Player::new(u.user_id).with_username(username_from_email(u.email.as_deref()))
    });

    let submission = service
        .submit_answer(
            player,
            challenge_id,
            &req.answer,
            req.time_spent,
        )
        .await;

    match submission {
        Some(submission @ Submission::UnknownChallenge) => {
            metrics::record_answer("unknown_challenge");
            HttpResponse::NotFound().json(submission)
        }
        Some(submission @ Submission::Incorrect) => {
            metrics::record_answer("incorrect");
            HttpResponse::Ok().json(submission)
        }
        Some(submission) => {
            if let Submission::Correct {
                category,
                new_achievements,
                ..
            } = &submission
            {
                metrics::record_answer("correct");
                metrics::record_completion(category.as_str(), new_achievements.len());
            }
            HttpResponse::Ok().json(submission)
        }
        None => something_went_wrong("submit_answer"),
    }
}

/// The auth flows themselves are hosted by the provider.
#[actix_web::get("/auth/{flow}")]
async fn auth_flow(path: web::Path<String>, app_state: web::Data<AppState>) -> impl Responder {
    let flow = path.into_inner();
    if flow != "sign-in" && flow != "sign-up" {
        return HttpResponse::NotFound().finish();
    }

    let AppState {
        auth_provider_url, ..
    } = &**app_state;
    HttpResponse::Ok().json(json!({
        "flow": flow,
        "provider_url": format!("{}/{}", auth_provider_url.trim_end_matches('/'), flow),
    }))
}

#[actix_web::get("/profile")]
async fn get_profile(user: AuthenticatedUser, app_state: web::Data<AppState>) -> impl Responder {
    let AppState { service, .. } = &**app_state;
    let username = username_from_email(user.email.as_deref());

    match service.get_profile(user.user_id, username).await {
        Some(profile) => HttpResponse::Ok().json(profile),
        None => something_went_wrong("get_profile"),
    }
}

#[actix_web::put("/profile/preferences")]
async fn update_preferences(
    user: AuthenticatedUser,
    req: web::Json<PreferencesUpdate>,
    app_state: web::Data<AppState>,
) -> impl Responder {
    let AppState { service, .. } = &**app_state;

    match service
        .update_preferences(user.user_id, req.into_inner())
        .await
    {
        Some(profile) => HttpResponse::Ok().json(profile),
        None => something_went_wrong("update_preferences"),
    }
}

#[actix_web::get("/progress")]
async fn load_progress(user: AuthenticatedUser, app_state: web::Data<AppState>) -> impl Responder {
    let AppState { service, .. } = &**app_state;

    match service.load_progress(user.user_id).await {
        Some(progress) => HttpResponse::Ok().json(progress),
        None => something_went_wrong("load_progress"),
    }
}

#[actix_web::get("/progress/summary")]
async fn progress_summary(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
) -> impl Responder {
    let AppState { service, .. } = &**app_state;

    match service.summary(user.user_id).await {
        Some(summary) => HttpResponse::Ok().json(summary),
        None => something_went_wrong("progress_summary"),
    }
}

#[actix_web::delete("/progress")]
async fn reset_progress(user: AuthenticatedUser, app_state: web::Data<AppState>) -> impl Responder {
    let AppState { service, .. } = &**app_state;
    info!("Resetting progress for {}", user.user_id);

    if service.reset_progress(user.user_id).await {
        metrics::PROGRESS_RESETS.inc();
        HttpResponse::NoContent().finish()
    } else {
        something_went_wrong("reset_progress")
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(metrics_endpoint)
        .service(daily_challenge)
        .service(list_challenges)
        .service(submit_answer)
        .service(auth_flow)
        .service(get_profile)
        .service(update_preferences)
        .service(progress_summary)
        .service(load_progress)
        .service(reset_progress);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        middleware::{GateRoutes, SessionGate},
        SessionKeys,
    };
    use actix_web::{
        http::{header, StatusCode},
        test::{call_and_read_body_json, call_service, init_service, TestRequest},
        App,
    };
    use chrono::NaiveDate;
    use common::memory::MemoryStore;
    use progress::clock::FixedClock;
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    fn keys() -> SessionKeys {
        SessionKeys::new("handler-secret", "authenticated")
    }

    fn state(store: Arc<MemoryStore>) -> web::Data<AppState> {
        let clock = Arc::new(FixedClock::on(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        ));
        web::Data::new(AppState {
            service: ProgressService::with_clock(store, clock),
            auth_provider_url: "https://auth.test/v1/".to_string(),
        })
    }

    fn bearer(user: Uuid, email: Option<&str>) -> (header::HeaderName, String) {
        let token = keys()
            .create_token(user, email.map(str::to_string), 60)
            .unwrap();
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    macro_rules! app {
        ($store:expr) => {
            init_service(
                App::new()
                    .app_data(state($store))
                    .wrap(SessionGate::new(keys(), GateRoutes::default()))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn challenges_hide_answers_and_filter_by_category() {
        let app = app!(Arc::new(MemoryStore::seeded()));

        let all: Value =
            call_and_read_body_json(&app, TestRequest::get().uri("/challenges").to_request())
                .await;
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 8);
        assert!(all.iter().all(|c| c.get("answer").is_none()));

        let logic: Value = call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri("/challenges?category=logic")
                .to_request(),
        )
        .await;
        assert!(logic
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["category"] == "logic"));
    }

    #[actix_web::test]
    async fn store_failure_is_a_generic_error() {
        let store = Arc::new(MemoryStore::seeded());
        store.fail_on("list_challenges");
        let app = app!(store);

        let resp = call_service(&app, TestRequest::get().uri("/challenges").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn anonymous_submission_is_checked_but_not_saved() {
        let store = Arc::new(MemoryStore::seeded());
        let app = app!(store.clone());

        let body: Value = call_and_read_body_json(
            &app,
            TestRequest::post()
                .uri("/challenges/2/submit")
                .set_json(json!({ "answer": "cold" }))
                .to_request(),
        )
        .await;

        assert_eq!(body["outcome"], "correct");
        assert!(body["profile"].is_null());
    }

    #[actix_web::test]
    async fn signed_in_submission_updates_profile() {
        let store = Arc::new(MemoryStore::seeded());
        let app = app!(store.clone());
        let user = Uuid::new_v4();

        let body: Value = call_and_read_body_json(
            &app,
            TestRequest::post()
                .uri("/challenges/3/submit")
                .insert_header(bearer(user, Some("ada@mind.test")))
                .set_json(json!({ "answer": "33", "time_spent": 20 }))
                .to_request(),
        )
        .await;

        assert_eq!(body["outcome"], "correct");
        assert_eq!(store.user_challenge_count(user), 1);
        assert_eq!(body["profile"]["current_streak"], 1);
        assert_eq!(body["profile"]["username"], "ada");
    }

    #[actix_web::test]
    async fn submission_edge_cases() {
        let app = app!(Arc::new(MemoryStore::seeded()));

        let unknown = call_service(
            &app,
            TestRequest::post()
                .uri("/challenges/999/submit")
                .set_json(json!({ "answer": "x" }))
                .to_request(),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let empty = call_service(
            &app,
            TestRequest::post()
                .uri("/challenges/1/submit")
                .set_json(json!({ "answer": "" }))
                .to_request(),
        )
        .await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let wrong: Value = call_and_read_body_json(
            &app,
            TestRequest::post()
                .uri("/challenges/2/submit")
                .set_json(json!({ "answer": "hot" }))
                .to_request(),
        )
        .await;
        assert_eq!(wrong["outcome"], "incorrect");
    }

    #[actix_web::test]
    async fn profile_is_provisioned_from_session() {
        let app = app!(Arc::new(MemoryStore::seeded()));
        let user = Uuid::new_v4();

        let profile: Value = call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri("/profile")
                .insert_header(bearer(user, Some("grace@mind.test")))
                .to_request(),
        )
        .await;

        assert_eq!(profile["id"], user.to_string());
        assert_eq!(profile["username"], "grace");
        assert_eq!(profile["level"], 1);
    }

    #[actix_web::test]
    async fn preferences_update_is_partial() {
        let app = app!(Arc::new(MemoryStore::seeded()));
        let user = Uuid::new_v4();

        let profile: Value = call_and_read_body_json(
            &app,
            TestRequest::put()
                .uri("/profile/preferences")
                .insert_header(bearer(user, None))
                .set_json(json!({ "darkMode": true }))
                .to_request(),
        )
        .await;

        assert_eq!(profile["preferences"]["darkMode"], true);
        assert_eq!(profile["preferences"]["notifications"], true);
    }

    #[actix_web::test]
    async fn reset_then_load_is_empty() {
        let store = Arc::new(MemoryStore::seeded());
        let app = app!(store.clone());
        let user = Uuid::new_v4();

        call_service(
            &app,
            TestRequest::post()
                .uri("/challenges/1/submit")
                .insert_header(bearer(user, None))
                .set_json(json!({ "answer": "racket" }))
                .to_request(),
        )
        .await;

        let reset = call_service(
            &app,
            TestRequest::delete()
                .uri("/progress")
                .insert_header(bearer(user, None))
                .to_request(),
        )
        .await;
        assert_eq!(reset.status(), StatusCode::NO_CONTENT);

        let progress: Value = call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri("/progress")
                .insert_header(bearer(user, None))
                .to_request(),
        )
        .await;
        assert_eq!(progress["profile"]["total_points"], 0);
        assert_eq!(progress["completed_challenges"], json!([]));
        assert_eq!(progress["achievements"], json!([]));
    }

    #[actix_web::test]
    async fn auth_pages_point_at_the_provider() {
        let app = app!(Arc::new(MemoryStore::seeded()));

        let body: Value = call_and_read_body_json(
            &app,
            TestRequest::get().uri("/auth/sign-up").to_request(),
        )
        .await;
        assert_eq!(body["provider_url"], "https://auth.test/v1/sign-up");

        let resp = call_service(&app, TestRequest::get().uri("/auth/reset").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
