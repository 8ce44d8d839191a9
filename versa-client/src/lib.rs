//! Клиентская библиотека GraphQL API сервиса Versa.
//!
//! `VersaClient` превращает именованные операции (регистрация, вход, OAuth,
//! текущий пользователь, посты) в POST-запросы к одному GraphQL-эндпоинту и
//! разворачивает ответы в типизированный результат или ошибку.
//!
//! Токен берётся из `SessionStore`, который передаётся клиенту явно. Сам
//! клиент сессию не меняет: это делает вызывающий код (исключение —
//! `GoogleOAuthExchange`, чей успешный исход и есть заполненная сессия).
#![warn(missing_docs)]

mod error;
mod graphql;
mod http_client;
mod models;
pub mod oauth;
pub mod session;

use std::sync::Arc;

pub use error::{VersaClientError, VersaClientResult};
pub use http_client::ClientConfig;
pub use models::{AuthPayload, DEFAULT_POST_CREDITS, Post, PostAuthor, PostPayload, Role, User};
pub use oauth::{GoogleOAuthExchange, OAuthState};
pub use session::{FileStorage, MemoryStorage, Session, SessionSnapshot, SessionStorage, SessionStore};

use http_client::HttpClient;

#[derive(Debug, Clone)]
/// Клиент GraphQL API.
///
/// Повторов нет: `createPost`/`editPost`/`deletePost` не идемпотентны.
pub struct VersaClient {
    http_client: HttpClient,
    session: Arc<SessionStore>,
}

impl VersaClient {
    /// Создаёт клиент поверх переданной сессии.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> VersaClientResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config)?,
            session,
        })
    }

    /// Сессия, из которой клиент берёт токен.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// URL эндпоинта.
    pub fn endpoint(&self) -> &str {
        self.http_client.endpoint()
    }

    /// Регистрирует пользователя и возвращает токен + данные пользователя.
    pub async fn register(&self, email: &str, password: &str) -> VersaClientResult<AuthPayload> {
        self.http_client.register(email, password).await
    }

    /// Выполняет вход и возвращает токен + данные пользователя.
    pub async fn login(&self, email: &str, password: &str) -> VersaClientResult<AuthPayload> {
        self.http_client.login(email, password).await
    }

    /// Меняет код Google OAuth на токен + данные пользователя.
    pub async fn google_oauth(&self, code: &str) -> VersaClientResult<AuthPayload> {
        self.http_client.google_oauth(code).await
    }

    /// Возвращает текущего пользователя.
    ///
    /// Требует токен в сессии.
    pub async fn me(&self) -> VersaClientResult<User> {
        let token = self.require_token()?;
        self.http_client.me(&token).await
    }

    /// Публикует пост стоимостью `DEFAULT_POST_CREDITS`.
    ///
    /// Требует токен в сессии.
    pub async fn create_post(&self, content: &str) -> VersaClientResult<PostPayload> {
        self.create_post_with_credits(content, DEFAULT_POST_CREDITS)
            .await
    }

    /// Публикует пост с явной стоимостью.
    ///
    /// Баланс проверяет сервер; при нехватке вернётся `Graphql("Insufficient credits")`.
    pub async fn create_post_with_credits(
        &self,
        content: &str,
        credits_used: i64,
    ) -> VersaClientResult<PostPayload> {
        let token = self.require_token()?;
        self.http_client
            .create_post(&token, content, credits_used)
            .await
    }

    /// Меняет текст поста.
    ///
    /// Требует токен в сессии.
    pub async fn edit_post(&self, post_id: &str, content: &str) -> VersaClientResult<PostPayload> {
        let token = self.require_token()?;
        self.http_client.edit_post(&token, post_id, content).await
    }

    /// Удаляет пост; сервер возвращает кредиты владельцу.
    ///
    /// Требует токен в сессии.
    pub async fn delete_post(&self, post_id: &str) -> VersaClientResult<PostPayload> {
        let token = self.require_token()?;
        self.http_client.delete_post(&token, post_id).await
    }

    /// Посты текущего пользователя.
    pub async fn posts(&self) -> VersaClientResult<Vec<Post>> {
        let token = self.require_token()?;
        self.http_client.posts(&token).await
    }

    /// Все посты с авторами (только для администраторов).
    pub async fn all_posts(&self) -> VersaClientResult<Vec<Post>> {
        let token = self.require_token()?;
        self.http_client.all_posts(&token).await
    }

    fn require_token(&self) -> VersaClientResult<String> {
        self.session
            .token()
            .filter(|token| !token.trim().is_empty())
            .ok_or(VersaClientError::Unauthenticated)
    }
}
