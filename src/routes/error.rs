use crate::middleware::rate_limit::RateLimitRetryAfter;
use rocket::http::{Header, Status};
use rocket::response::{Responder, Response};
use rocket::serde::json::Json;
use rocket::{Request, catch};
use serde::Serialize;

#[derive(Serialize)]
pub struct Error {
    pub error: String,
}

fn error(message: &str) -> Json<Error> {
    Json(Error { error: message.to_string() })
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<Error> {
    error("Bad request")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<Error> {
    error("Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<Error> {
    error("Conflict")
}

#[catch(413)]
pub fn payload_too_large(_: &Request) -> Json<Error> {
    error("Payload too large")
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<Error> {
    error("Unprocessable entity")
}

#[catch(500)]
pub fn internal_server_error(_: &Request) -> Json<Error> {
    error("Internal server error")
}

pub struct TooManyRequests {
    retry_after: Option<u64>,
}

impl<'r> Responder<'r, 'static> for TooManyRequests {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let mut response = Response::build_from(error("Too many requests").respond_to(request)?);
        response.status(Status::TooManyRequests);
        if let Some(retry_after) = self.retry_after {
            response.header(Header::new("Retry-After", retry_after.to_string()));
        }
        response.ok()
    }
}

#[catch(429)]
pub fn too_many_requests(request: &Request) -> TooManyRequests {
    let retry_after = request.local_cache(|| None::<RateLimitRetryAfter>).as_ref().map(|value| value.0);
    TooManyRequests { retry_after }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::catchers;
    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;

    #[rocket::async_test]
    async fn unknown_routes_get_json_error_body() {
        let rocket = rocket::build().register("/", catchers![not_found]);
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client.get("/nowhere").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.content_type(), Some(ContentType::JSON));

        let body: serde_json::Value = response.into_json().await.expect("json body");
        assert_eq!(body["error"], "Not found");
    }
}
