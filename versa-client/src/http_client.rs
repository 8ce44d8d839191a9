use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{VersaClientError, VersaClientResult};
use crate::graphql::{self, GraphqlRequest, GraphqlResponse, unwrap_field};
use crate::models::{AuthPayload, Post, PostPayload, User};

#[derive(Debug, Serialize)]
struct CredentialsVars<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct CodeVars<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostVars<'a> {
    content: &'a str,
    credits_used: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditPostVars<'a> {
    post_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostIdVars<'a> {
    post_id: &'a str,
}

#[derive(Debug, Clone)]
/// Параметры HTTP-транспорта.
pub struct ClientConfig {
    /// URL GraphQL-эндпоинта.
    pub endpoint: String,
    /// Таймаут установки соединения.
    pub connect_timeout: Duration,
    /// Таймаут всего запроса.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Эндпоинт production-API.
    pub const DEFAULT_ENDPOINT: &'static str = "https://versa-api-f9sl.onrender.com/graphql/";

    /// Конфигурация с таймаутами по умолчанию.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENDPOINT)
    }
}

#[derive(Debug, Clone)]
/// HTTP-клиент GraphQL API: один POST на операцию, без ретраев.
pub(crate) struct HttpClient {
    endpoint: String,
    client: Client,
}

impl HttpClient {
    pub(crate) fn new(config: &ClientConfig) -> VersaClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// универсальный helper: отправляет запрос и разворачивает поле `field`
    async fn execute<V, T>(
        &self,
        query: &str,
        variables: V,
        field: &str,
        token: Option<&str>,
    ) -> VersaClientResult<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = GraphqlRequest { query, variables };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!(operation = field, authenticated = token.is_some(), "sending graphql request");
        let response = request.send().await?;

        // GraphQL-серверы отдают конверт с ошибками и на 4xx, поэтому статус
        // не используется для классификации.
        let status = response.status();
        let raw = response.text().await?;
        let envelope: GraphqlResponse = serde_json::from_str(&raw)
            .map_err(|err| VersaClientError::invalid_body(status, err))?;

        let result = unwrap_field(envelope, field);
        if let Err(err) = &result {
            debug!(operation = field, %status, error = %err, "graphql request failed");
        }
        result
    }

    pub(crate) async fn register(&self, email: &str, password: &str) -> VersaClientResult<AuthPayload> {
        let vars = CredentialsVars { email, password };
        self.execute(graphql::REGISTER, vars, "register", None).await
    }

    pub(crate) async fn login(&self, email: &str, password: &str) -> VersaClientResult<AuthPayload> {
        let vars = CredentialsVars { email, password };
        self.execute(graphql::LOGIN, vars, "login", None).await
    }

    pub(crate) async fn google_oauth(&self, code: &str) -> VersaClientResult<AuthPayload> {
        self.execute(graphql::GOOGLE_OAUTH, CodeVars { code }, "googleOAuth", None)
            .await
    }

    pub(crate) async fn me(&self, token: &str) -> VersaClientResult<User> {
        self.execute(graphql::ME, json!({}), "me", Some(token)).await
    }

    pub(crate) async fn create_post(
        &self,
        token: &str,
        content: &str,
        credits_used: i64,
    ) -> VersaClientResult<PostPayload> {
        let vars = CreatePostVars {
            content,
            credits_used,
        };
        self.execute(graphql::CREATE_POST, vars, "createPost", Some(token))
            .await
    }

    pub(crate) async fn edit_post(
        &self,
        token: &str,
        post_id: &str,
        content: &str,
    ) -> VersaClientResult<PostPayload> {
        let vars = EditPostVars { post_id, content };
        self.execute(graphql::EDIT_POST, vars, "editPost", Some(token))
            .await
    }

    pub(crate) async fn delete_post(&self, token: &str, post_id: &str) -> VersaClientResult<PostPayload> {
        self.execute(graphql::DELETE_POST, PostIdVars { post_id }, "deletePost", Some(token))
            .await
    }

    pub(crate) async fn posts(&self, token: &str) -> VersaClientResult<Vec<Post>> {
        self.execute(graphql::POSTS, json!({}), "posts", Some(token))
            .await
    }

    pub(crate) async fn all_posts(&self, token: &str) -> VersaClientResult<Vec<Post>> {
        self.execute(graphql::ALL_POSTS, json!({}), "allPosts", Some(token))
            .await
    }
}
