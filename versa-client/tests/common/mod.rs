//! In-process stub of the Versa GraphQL server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use versa_client::{ClientConfig, SessionStore, VersaClient};

pub const USER_TOKEN: &str = "jwt-user";
pub const ADMIN_TOKEN: &str = "jwt-admin";
pub const PASSWORD: &str = "secret";
pub const GOOD_OAUTH_CODE: &str = "good-code";

#[derive(Clone)]
pub struct Stub {
    hits: Arc<AtomicUsize>,
    credits: Arc<Mutex<i64>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl Stub {
    pub fn new(credits: i64) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            credits: Arc::new(Mutex::new(credits)),
            auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().expect("lock").clone()
    }

    fn credits(&self) -> i64 {
        *self.credits.lock().expect("lock")
    }

    fn add_credits(&self, delta: i64) -> i64 {
        let mut credits = self.credits.lock().expect("lock");
        *credits += delta;
        *credits
    }
}

fn user_json(id: &str, email: &str, credits: i64, role: &str) -> Value {
    json!({ "id": id, "email": email, "credits": credits, "role": role })
}

fn post_json(id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "creditsUsed": 10,
        "createdAt": "2026-01-01T00:00:00+00:00",
        "updatedAt": "2026-01-01T00:05:00.250000+00:00"
    })
}

fn error(message: &str) -> Value {
    json!({ "errors": [{ "message": message }], "data": null })
}

fn viewer(stub: &Stub, token: Option<&str>) -> Result<Value, Value> {
    match token {
        None => Err(error("No token provided")),
        Some(USER_TOKEN) => Ok(user_json("u1", "a@b.com", stub.credits(), "USER")),
        Some(ADMIN_TOKEN) => Ok(user_json("admin", "root@b.com", 1000, "ADMIN")),
        Some(_) => Err(error("Invalid token")),
    }
}

async fn graphql(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.hits.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    stub.auth_headers.lock().expect("lock").push(authorization.clone());
    let token = authorization
        .as_deref()
        .and_then(|value| value.strip_prefix("Bearer "));

    let query = body["query"].as_str().unwrap_or_default();
    let vars = &body["variables"];

    let reply = if query.contains("mutation Register") {
        let email = vars["email"].as_str().unwrap_or_default();
        Ok(json!({ "data": { "register": {
            "token": USER_TOKEN,
            "user": user_json("u1", email, 100, "USER"),
        }}}))
    } else if query.contains("mutation Login") {
        if vars["password"] == PASSWORD {
            Ok(json!({ "data": { "login": {
                "token": USER_TOKEN,
                "user": user_json("u1", "a@b.com", stub.credits(), "USER"),
            }}}))
        } else {
            Err(error("Invalid credentials"))
        }
    } else if query.contains("mutation GoogleOAuth") {
        if vars["code"] == GOOD_OAUTH_CODE {
            Ok(json!({ "data": { "googleOAuth": {
                "token": USER_TOKEN,
                "user": user_json("u1", "a@b.com", stub.credits(), "USER"),
            }}}))
        } else {
            Err(error("Invalid OAuth code"))
        }
    } else if query.contains("query Me") {
        viewer(&stub, token).map(|user| json!({ "data": { "me": user } }))
    } else if query.contains("mutation CreatePost") {
        viewer(&stub, token).and_then(|_| {
            let cost = vars["creditsUsed"].as_i64().unwrap_or(10);
            if stub.credits() < cost {
                return Err(error("Insufficient credits"));
            }
            let credits = stub.add_credits(-cost);
            let content = vars["content"].as_str().unwrap_or_default();
            Ok(json!({ "data": { "createPost": {
                "post": post_json("p1", content),
                "user": user_json("u1", "a@b.com", credits, "USER"),
            }}}))
        })
    } else if query.contains("mutation EditPost") {
        viewer(&stub, token).and_then(|user| {
            if vars["postId"] != "p1" {
                return Err(error("Post not found"));
            }
            let content = vars["content"].as_str().unwrap_or_default();
            Ok(json!({ "data": { "editPost": {
                "post": post_json("p1", content),
                "user": user,
            }}}))
        })
    } else if query.contains("mutation DeletePost") {
        viewer(&stub, token).map(|_| {
            let credits = stub.add_credits(10);
            json!({ "data": { "deletePost": {
                "post": null,
                "user": user_json("u1", "a@b.com", credits, "USER"),
            }}})
        })
    } else if query.contains("query AllPosts") {
        viewer(&stub, token).and_then(|user| {
            if user["role"] != "ADMIN" {
                return Err(error("Only admins can view all posts"));
            }
            let mut post = post_json("p1", "hello");
            post["user"] = json!({ "id": "u1", "email": "a@b.com" });
            Ok(json!({ "data": { "allPosts": [post] } }))
        })
    } else if query.contains("query Posts") {
        viewer(&stub, token).map(|_| json!({ "data": { "posts": [post_json("p1", "hello")] } }))
    } else {
        Err(error("Unknown operation"))
    };

    match reply {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(body) => (StatusCode::BAD_REQUEST, Json(body)),
    }
}

async fn broken(State(stub): State<Stub>) -> impl IntoResponse {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::BAD_GATEWAY, "<html><body>502 Bad Gateway</body></html>")
}

/// Starts the stub and returns its GraphQL endpoint and a "broken" endpoint
/// answering with HTML.
pub async fn spawn_stub(stub: Stub) -> (String, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("local addr");

    let app = Router::new()
        .route("/graphql/", post(graphql))
        .route("/broken", post(broken))
        .with_state(stub);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    (
        format!("http://{addr}/graphql/"),
        format!("http://{addr}/broken"),
    )
}

pub fn client(endpoint: &str) -> VersaClient {
    VersaClient::new(
        ClientConfig::new(endpoint),
        Arc::new(SessionStore::in_memory()),
    )
    .expect("client must build")
}
