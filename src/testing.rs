//! In-process test client for the full router.
//!
//! Drives [`crate::app`] with `oneshot` against an in-memory store and keeps
//! the session cookie between requests like a browser would.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::config::Config;
use crate::models::{fixtures, Store, User};
use crate::session::{SessionData, SESSION_COOKIE};
use crate::state::AppState;

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    pub async fn with_csrf() -> Self {
        let mut config = Config::for_tests();
        config.auth.csrf_enabled = true;
        Self::with_config(config).await
    }

    async fn with_config(config: Config) -> Self {
        let store = Store::open(&config.database.path).unwrap();
        store.create_all().await.unwrap();
        let state = AppState::new(config, store).unwrap();
        Self {
            router: crate::app(state.clone()),
            state,
            cookie: None,
        }
    }

    pub async fn signup(&self, username: &str, password: &str) -> User {
        fixtures::signup(&self.state.store, username, password).await
    }

    /// Current session payload, verified with the app's key.
    pub fn session(&self) -> SessionData {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &self.cookie {
            headers.insert(header::COOKIE, cookie.parse().unwrap());
        }
        SignedCookieJar::from_headers(&headers, self.state.cookie_key.clone())
            .get(SESSION_COOKIE)
            .and_then(|c| serde_json::from_str(c.value()).ok())
            .unwrap_or_default()
    }

    /// Overwrite the session cookie with `data`, signed.
    pub fn set_session(&mut self, data: &SessionData) {
        let jar = SignedCookieJar::new(self.state.cookie_key.clone()).add(Cookie::new(
            SESSION_COOKIE,
            serde_json::to_string(data).unwrap(),
        ));
        let response = jar.into_response();
        self.keep_cookie(response.headers());
    }

    /// Log in as `user` without going through the login form.
    pub fn login_as(&mut self, user: &User) {
        let mut data = self.session();
        data.curr_user = Some(user.id);
        self.set_session(&data);
    }

    /// Fetch a page so the session mints a CSRF token, and return it.
    pub async fn csrf_token(&mut self) -> String {
        self.get("/login").await;
        self.session().csrf_token.unwrap()
    }

    fn keep_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap()).unwrap();
            if cookie.name() == SESSION_COOKIE {
                self.cookie = (!cookie.value().is_empty())
                    .then(|| format!("{}={}", cookie.name(), cookie.value()));
            }
        }
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        self.keep_cookie(response.headers());
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Follow `302`s with GETs until a page comes back.
    async fn follow(&mut self, mut res: TestResponse) -> TestResponse {
        while res.status == StatusCode::FOUND {
            let to = res.location.clone().unwrap();
            res = self.get(&to).await;
        }
        res
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str) -> TestResponse {
        self.send(Method::POST, uri, None).await
    }

    pub async fn post_form(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send(Method::POST, uri, Some(form)).await
    }

    pub async fn get_follow(&mut self, uri: &str) -> TestResponse {
        let res = self.get(uri).await;
        self.follow(res).await
    }

    pub async fn post_follow(&mut self, uri: &str) -> TestResponse {
        let res = self.post(uri).await;
        self.follow(res).await
    }

    pub async fn post_form_follow(&mut self, uri: &str, form: &str) -> TestResponse {
        let res = self.post_form(uri, form).await;
        self.follow(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_are_uncacheable() {
        let mut app = TestApp::new().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=0");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(app.get("/").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_default_images_are_served() {
        let mut app = TestApp::new().await;
        for uri in [
            crate::models::DEFAULT_IMAGE_URL,
            crate::models::DEFAULT_HEADER_IMAGE_URL,
            "/static/images/warbler-logo.png",
        ] {
            let response = app
                .router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        }
        assert_eq!(
            app.get("/static/images/default-pic.png").await.status,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_removal_cookie_clears_session() {
        let mut app = TestApp::new().await;
        let me = app.signup("testuser", "testuser").await;
        app.login_as(&me);
        assert!(app.cookie.is_some());

        let res = app.post("/users/delete").await;
        assert_eq!(res.location.as_deref(), Some("/signup"));
        assert!(app.cookie.is_none());
        assert_eq!(app.session().curr_user, None);
    }
}
