use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Стоимость публикации поста в кредитах, если не указано иное.
pub const DEFAULT_POST_CREDITS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// Роль пользователя.
pub enum Role {
    /// Обычный пользователь.
    User,
    /// Администратор: видит и редактирует посты всех пользователей.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Публичная модель пользователя.
///
/// Клиент хранит только кэшированную копию, источник истины — сервер.
pub struct User {
    /// Идентификатор пользователя (UUID).
    pub id: String,
    /// Email.
    pub email: String,
    /// Баланс кредитов.
    pub credits: i64,
    /// Роль.
    pub role: Role,
}

impl User {
    /// Хватает ли баланса на операцию стоимостью `cost`.
    pub fn can_afford(&self, cost: i64) -> bool {
        self.credits >= cost
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Автор поста (только в выдаче `allPosts`).
pub struct PostAuthor {
    /// Идентификатор автора.
    pub id: String,
    /// Email автора.
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель поста.
pub struct Post {
    /// Идентификатор поста (UUID).
    pub id: String,
    /// Текст поста.
    pub content: String,
    /// Сколько кредитов списано за публикацию.
    pub credits_used: i64,
    /// Дата и время создания поста (UTC).
    pub created_at: DateTime<Utc>,
    /// Дата и время последнего обновления поста (UTC).
    pub updated_at: DateTime<Utc>,
    /// Автор, если сервер его вернул.
    #[serde(default)]
    pub user: Option<PostAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ответ после успешной регистрации, входа или OAuth-обмена.
pub struct AuthPayload {
    /// Bearer-токен.
    pub token: String,
    /// Данные пользователя.
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ответ мутаций над постами.
///
/// `user` — актуальное состояние пользователя после списания/возврата
/// кредитов. После `deletePost` поле `post` пустое.
pub struct PostPayload {
    /// Пост после операции.
    pub post: Option<Post>,
    /// Пользователь после операции.
    pub user: User,
}
