use crate::models::health::HealthResponse;
use crate::session_store::SessionStore;
use rocket::{State, get};
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use std::sync::Arc;

/// Liveness probe, reporting how many sessions are held in memory
#[openapi(tag = "Health")]
#[get("/")]
pub async fn healthcheck(store: &State<Arc<SessionStore>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: store.count().await,
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![healthcheck]
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_client;
    use rocket::http::Status;

    #[rocket::async_test]
    async fn health_check_works() {
        let (client, _) = test_client().await;
        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body: serde_json::Value = response.into_json().await.expect("json body");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeSessions"], 0);
    }
}
