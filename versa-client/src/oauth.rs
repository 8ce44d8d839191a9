//! Обмен кода Google OAuth на сессию.
//!
//! `AwaitingCode -> Exchanging -> {Authenticated, Failed}`. Терминальные
//! состояния не повторяются автоматически.

use reqwest::Url;
use tracing::{debug, warn};

use crate::VersaClient;
use crate::models::User;

/// Сообщение об ошибке, когда в callback-URL нет кода.
pub const NO_CODE_MESSAGE: &str = "No code provided";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Состояние обмена.
pub enum OAuthState {
    /// Ждём код (он может так и не появиться).
    AwaitingCode,
    /// Код отправлен на сервер.
    Exchanging,
    /// Сессия заполнена.
    Authenticated(User),
    /// Обмен не удался, сессия не тронута.
    Failed(String),
}

impl OAuthState {
    /// `true` для `Authenticated` и `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackInput {
    Code(String),
    ProviderError(String),
    Missing,
}

/// Достаёт `code` из query-параметров callback-URL.
pub fn extract_code(callback_url: &str) -> Option<String> {
    match parse_callback(callback_url) {
        CallbackInput::Code(code) => Some(code),
        _ => None,
    }
}

fn parse_callback(callback_url: &str) -> CallbackInput {
    let Ok(url) = Url::parse(callback_url) else {
        return CallbackInput::Missing;
    };

    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.trim().is_empty() => return CallbackInput::Code(value.into_owned()),
            "error" if !value.trim().is_empty() => error = Some(value.into_owned()),
            _ => {}
        }
    }

    error.map_or(CallbackInput::Missing, CallbackInput::ProviderError)
}

#[derive(Debug)]
/// Один проход обмена OAuth-кода.
pub struct GoogleOAuthExchange {
    input: CallbackInput,
    state: OAuthState,
}

impl GoogleOAuthExchange {
    /// Начинает обмен по callback-URL провайдера.
    pub fn from_callback_url(callback_url: &str) -> Self {
        Self {
            input: parse_callback(callback_url),
            state: OAuthState::AwaitingCode,
        }
    }

    /// Начинает обмен с уже извлечённым кодом (пустой код = кода нет).
    pub fn from_code(code: Option<&str>) -> Self {
        let input = match code.map(str::trim) {
            Some(code) if !code.is_empty() => CallbackInput::Code(code.to_string()),
            _ => CallbackInput::Missing,
        };
        Self {
            input,
            state: OAuthState::AwaitingCode,
        }
    }

    /// Текущее состояние.
    pub fn state(&self) -> &OAuthState {
        &self.state
    }

    /// Доводит обмен до терминального состояния.
    ///
    /// При успехе записывает пользователя и токен в сессию клиента. При любой
    /// ошибке сессия остаётся прежней, а сообщение попадает в `Failed`.
    /// Повторный вызов после терминального состояния запросов не делает.
    pub async fn run(&mut self, client: &VersaClient) -> &OAuthState {
        if !self.state.is_terminal() {
            self.state = self.exchange(client).await;
        }
        &self.state
    }

    async fn exchange(&mut self, client: &VersaClient) -> OAuthState {
        let code = match std::mem::replace(&mut self.input, CallbackInput::Missing) {
            CallbackInput::Code(code) => code,
            CallbackInput::ProviderError(error) => {
                warn!(%error, "oauth provider returned an error");
                return OAuthState::Failed(error);
            }
            CallbackInput::Missing => return OAuthState::Failed(NO_CODE_MESSAGE.to_string()),
        };

        self.state = OAuthState::Exchanging;
        debug!("exchanging oauth code");

        let auth = match client.google_oauth(&code).await {
            Ok(auth) => auth,
            Err(err) => return OAuthState::Failed(err.to_string()),
        };

        match client.session().set_auth(auth.user.clone(), auth.token) {
            Ok(()) => OAuthState::Authenticated(auth.user),
            Err(err) => OAuthState::Failed(err.to_string()),
        }
    }
}
