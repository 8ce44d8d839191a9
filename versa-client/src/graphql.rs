//! GraphQL-конверт `{data, errors}` и его разворачивание.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{VersaClientError, VersaClientResult};

#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest<'a, V: Serialize> {
    pub(crate) query: &'a str,
    pub(crate) variables: V,
}

/// Сообщение для записи `errors` без поля `message`.
pub(crate) const UNKNOWN_ERROR_MESSAGE: &str = "unknown graphql error";

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse {
    #[serde(default)]
    pub(crate) data: Option<Map<String, Value>>,
    #[serde(default)]
    pub(crate) errors: Option<Vec<GraphqlError>>,
}

/// Достаёт из конверта поле `field` и десериализует его в `T`.
///
/// Непустой `errors` важнее `data`: возвращается сообщение первой ошибки.
pub(crate) fn unwrap_field<T: DeserializeOwned>(
    envelope: GraphqlResponse,
    field: &str,
) -> VersaClientResult<T> {
    if let Some(first) = envelope.errors.and_then(|errors| errors.into_iter().next()) {
        let message = first
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
        return Err(VersaClientError::Graphql(message));
    }

    let value = envelope
        .data
        .and_then(|mut data| data.remove(field))
        .filter(|value| !value.is_null())
        .ok_or_else(|| {
            VersaClientError::InvalidResponse(format!("graphql response is missing data.{field}"))
        })?;

    serde_json::from_value(value).map_err(|err| {
        VersaClientError::InvalidResponse(format!("unexpected shape of data.{field}: {err}"))
    })
}

pub(crate) const REGISTER: &str = r#"
mutation Register($email: String!, $password: String!) {
  register(email: $email, password: $password) {
    token
    user { id email credits role }
  }
}
"#;

pub(crate) const LOGIN: &str = r#"
mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    token
    user { id email credits role }
  }
}
"#;

pub(crate) const GOOGLE_OAUTH: &str = r#"
mutation GoogleOAuth($code: String!) {
  googleOAuth(code: $code) {
    token
    user { id email credits role }
  }
}
"#;

pub(crate) const ME: &str = r#"
query Me {
  me { id email credits role }
}
"#;

pub(crate) const CREATE_POST: &str = r#"
mutation CreatePost($content: String!, $creditsUsed: Int) {
  createPost(content: $content, creditsUsed: $creditsUsed) {
    post { id content creditsUsed createdAt updatedAt }
    user { id email credits role }
  }
}
"#;

pub(crate) const EDIT_POST: &str = r#"
mutation EditPost($postId: ID!, $content: String!) {
  editPost(postId: $postId, content: $content) {
    post { id content creditsUsed createdAt updatedAt }
    user { id email credits role }
  }
}
"#;

pub(crate) const DELETE_POST: &str = r#"
mutation DeletePost($postId: ID!) {
  deletePost(postId: $postId) {
    post { id content creditsUsed createdAt updatedAt }
    user { id email credits role }
  }
}
"#;

pub(crate) const POSTS: &str = r#"
query Posts {
  posts { id content creditsUsed createdAt updatedAt }
}
"#;

pub(crate) const ALL_POSTS: &str = r#"
query AllPosts {
  allPosts {
    id content creditsUsed createdAt updatedAt
    user { id email }
  }
}
"#;
