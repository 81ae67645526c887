use super::{session_token, SessionKeys};
use crate::metrics;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::{
    rc::Rc,
    task::{Context, Poll},
};

/// Paths the gate cares about. Everything else passes through untouched.
#[derive(Debug, Clone)]
pub struct GateRoutes {
    pub auth_prefixes: Vec<String>,
    pub protected_prefixes: Vec<String>,
    pub landing: String,
    pub sign_in: String,
}

impl Default for GateRoutes {
    fn default() -> Self {
        Self {
            auth_prefixes: vec!["/auth".to_string()],
            protected_prefixes: vec!["/profile".to_string(), "/progress".to_string()],
            landing: "/challenges".to_string(),
            sign_in: "/auth/sign-in".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Redirect(String),
}

/// `/profile` and `/profile/x` are under `/profile`, `/profiles` is not.
fn under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn gate(path: &str, has_session: bool, routes: &GateRoutes) -> GateDecision {
    let in_any = |prefixes: &[String]| prefixes.iter().any(|p| under_prefix(path, p));

    if has_session && in_any(&routes.auth_prefixes) {
        return GateDecision::Redirect(routes.landing.clone());
    }
    if !has_session && in_any(&routes.protected_prefixes) {
        return GateDecision::Redirect(routes.sign_in.clone());
    }
    GateDecision::PassThrough
}

/// Redirects signed-in users away from the auth pages and anonymous users
/// away from protected pages. Valid session claims are left in the request
/// extensions for `AuthenticatedUser`.
pub struct SessionGate {
    keys: SessionKeys,
    routes: Rc<GateRoutes>,
}

impl SessionGate {
    pub fn new(keys: SessionKeys, routes: GateRoutes) -> Self {
        Self {
            keys,
            routes: Rc::new(routes),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionGateService {
            service,
            keys: self.keys.clone(),
            routes: self.routes.clone(),
        })
    }
}

pub struct SessionGateService<S> {
    service: S,
    keys: SessionKeys,
    routes: Rc<GateRoutes>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // An invalid or expired token counts as no session
        let claims = session_token(req.request()).and_then(|t| self.keys.validate_token(&t));
        let has_session = claims.is_some();
        if let Some(claims) = claims {
            req.extensions_mut().insert(claims);
        }

        if let GateDecision::Redirect(target) = gate(req.path(), has_session, &self.routes) {
            tracing::debug!("Gate redirecting {} to {}", req.path(), target);
            metrics::record_redirect(&target);
            let response = HttpResponse::SeeOther()
                .insert_header((header::LOCATION, target))
                .finish();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use actix_web::{
        http::StatusCode,
        test::{call_and_read_body, call_service, init_service, TestRequest},
        web, App, HttpResponse, Responder,
    };
    use uuid::Uuid;

    const SECRET: &str = "gate-secret";

    fn keys() -> SessionKeys {
        SessionKeys::new(SECRET, "authenticated")
    }

    async fn ok_handler() -> impl Responder {
        HttpResponse::Ok().body("ok")
    }

    async fn whoami(user: AuthenticatedUser) -> impl Responder {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[test]
    fn gate_matrix() {
        let routes = GateRoutes::default();

        assert_eq!(
            gate("/auth/sign-in", true, &routes),
            GateDecision::Redirect("/challenges".to_string())
        );
        assert_eq!(gate("/auth/sign-in", false, &routes), GateDecision::PassThrough);
        assert_eq!(
            gate("/profile", false, &routes),
            GateDecision::Redirect("/auth/sign-in".to_string())
        );
        assert_eq!(
            gate("/progress/summary", false, &routes),
            GateDecision::Redirect("/auth/sign-in".to_string())
        );
        assert_eq!(gate("/profile", true, &routes), GateDecision::PassThrough);
        assert_eq!(gate("/challenges", false, &routes), GateDecision::PassThrough);
        assert_eq!(gate("/challenges", true, &routes), GateDecision::PassThrough);
    }

    #[test]
    fn prefixes_match_whole_segments() {
        let routes = GateRoutes::default();

        assert_eq!(gate("/profiles", false, &routes), GateDecision::PassThrough);
        assert_eq!(gate("/authors", true, &routes), GateDecision::PassThrough);
    }

    #[actix_web::test]
    async fn anonymous_profile_request_is_sent_to_sign_in() {
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(keys(), GateRoutes::default()))
                .route("/profile", web::get().to(ok_handler)),
        )
        .await;

        let req = TestRequest::get().uri("/profile").to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/auth/sign-in"
        );
    }

    #[actix_web::test]
    async fn signed_in_user_is_sent_away_from_auth_pages() {
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(keys(), GateRoutes::default()))
                .route("/auth/sign-in", web::get().to(ok_handler)),
        )
        .await;
        let token = keys().create_token(Uuid::new_v4(), None, 60).unwrap();

        let req = TestRequest::get()
            .uri("/auth/sign-in")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/challenges");
    }

    #[actix_web::test]
    async fn session_cookie_reaches_the_handler() {
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(keys(), GateRoutes::default()))
                .route("/profile", web::get().to(whoami)),
        )
        .await;
        let user = Uuid::new_v4();
        let token = keys().create_token(user, None, 60).unwrap();

        let req = TestRequest::get()
            .uri("/profile")
            .cookie(actix_web::cookie::Cookie::new(crate::auth::SESSION_COOKIE, token))
            .to_request();
        let body = call_and_read_body(&app, req).await;

        assert_eq!(body, user.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn forged_token_is_treated_as_anonymous() {
        let app = init_service(
            App::new()
                .wrap(SessionGate::new(keys(), GateRoutes::default()))
                .route("/progress", web::get().to(ok_handler)),
        )
        .await;
        let forged = SessionKeys::new("someone-else", "authenticated")
            .create_token(Uuid::new_v4(), None, 60)
            .unwrap();

        let req = TestRequest::get()
            .uri("/progress")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", forged)))
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }
}
