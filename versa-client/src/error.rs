use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `versa-client`.
pub enum VersaClientError {
    /// Операция требует токен, а в сессии его нет. Запрос в сеть не отправлялся.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Сервер вернул непустой массив `errors` в GraphQL-ответе.
    ///
    /// Хранит сообщение первой ошибки, остальные отбрасываются.
    #[error("{0}")]
    Graphql(String),

    /// Ошибка HTTP-транспорта (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Тело ответа не является JSON или в нём нет ожидаемого поля.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Ошибка чтения/записи постоянного хранилища сессии.
    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Ошибка сериализации сессии.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Запись в сессию отклонена: с момента чтения сессия уже изменилась.
    #[error("session changed since it was read")]
    StaleSession,
}

/// Результат операций `versa-client`.
pub type VersaClientResult<T> = Result<T, VersaClientError>;

impl VersaClientError {
    /// `true` для ошибок транспортного уровня: сеть недоступна, тело не JSON,
    /// конверт без ожидаемых данных.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::InvalidResponse(_))
    }

    pub(crate) fn invalid_body(status: reqwest::StatusCode, err: serde_json::Error) -> Self {
        Self::InvalidResponse(format!("http status {status}, body is not a graphql envelope: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_error_displays_server_message_verbatim() {
        let err = VersaClientError::Graphql("Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(!err.is_transport());
    }

    #[test]
    fn invalid_response_is_transport_class() {
        let err = VersaClientError::InvalidResponse("garbage".to_string());
        assert!(err.is_transport());
        assert!(!VersaClientError::Unauthenticated.is_transport());
    }
}
