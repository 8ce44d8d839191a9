//! Хранилище сессии: текущий пользователь и bearer-токен.
//!
//! Один `SessionStore` на клиента. Передаётся явно (обычно как
//! `Arc<SessionStore>`) в `VersaClient` и в слой представления. Записи
//! сериализуются внутренним мьютексом; по умолчанию действует правило
//! "последняя запись побеждает", `set_auth_if_current` позволяет отклонить
//! устаревшую запись.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VersaClientError, VersaClientResult};
use crate::models::User;

/// Ключ, под которым сессия лежит в постоянном хранилище.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// Постоянное хранилище строк по ключу (аналог `localStorage`).
pub trait SessionStorage: Send + Sync {
    /// Читает значение по ключу.
    fn get_item(&self, key: &str) -> io::Result<Option<String>>;
    /// Записывает значение по ключу.
    fn set_item(&self, key: &str, value: &str) -> io::Result<()>;
    /// Удаляет значение по ключу. Отсутствие ключа не ошибка.
    fn remove_item(&self, key: &str) -> io::Result<()>;
}

#[derive(Debug)]
/// Файловое хранилище: каждый ключ — отдельный `<dir>/<key>.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Создаёт хранилище в каталоге `dir` (каталог создаётся при первой записи).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Каталог хранилища.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        self.items().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Пара `{user, token}`. Оба поля либо заданы, либо пусты.
pub struct Session {
    user: Option<User>,
    token: Option<String>,
}

impl Session {
    /// Пустой или пробельный токен не считается токеном.
    fn authenticated(user: User, token: String) -> VersaClientResult<Self> {
        if token.trim().is_empty() {
            return Err(VersaClientError::Unauthenticated);
        }
        Ok(Self {
            user: Some(user),
            token: Some(token),
        })
    }

    /// Текущий пользователь.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Текущий токен.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Есть ли аутентифицированная личность.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn is_consistent(&self) -> bool {
        self.user.is_some() == self.token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Снимок сессии вместе с номером ревизии, на которой он сделан.
pub struct SessionSnapshot {
    /// Сессия.
    pub session: Session,
    /// Монотонный номер записи.
    pub revision: u64,
}

#[derive(Debug)]
struct State {
    session: Session,
    revision: u64,
}

/// Хранилище текущей сессии с зеркалированием в `SessionStorage`.
pub struct SessionStore {
    state: Mutex<State>,
    storage: Box<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn parse_session(raw: &str) -> Option<Session> {
    let session = serde_json::from_str::<Session>(raw).ok()?;
    if let Some(token) = &session.token {
        if token.trim().is_empty() {
            return None;
        }
    }
    session.is_consistent().then_some(session)
}

impl SessionStore {
    /// Открывает хранилище и восстанавливает сессию до первого чтения.
    ///
    /// Повреждённые данные (не JSON, чужая форма, только одно поле из пары)
    /// дают пустую сессию. Ошибка ввода-вывода при чтении возвращается.
    pub fn open(storage: impl SessionStorage + 'static) -> VersaClientResult<Self> {
        let session = match storage.get_item(SESSION_STORAGE_KEY)? {
            None => Session::default(),
            Some(raw) => parse_session(&raw).unwrap_or_else(|| {
                warn!(key = SESSION_STORAGE_KEY, "stored session is malformed, starting empty");
                Session::default()
            }),
        };
        debug!(authenticated = session.is_authenticated(), "session rehydrated");

        Ok(Self {
            state: Mutex::new(State {
                session,
                revision: 0,
            }),
            storage: Box::new(storage),
        })
    }

    /// Хранилище в памяти, без восстановления.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(State {
                session: Session::default(),
                revision: 0,
            }),
            storage: Box::new(MemoryStorage::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Копия текущей сессии.
    pub fn session(&self) -> Session {
        self.state().session.clone()
    }

    /// Сессия и номер ревизии одним чтением.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            session: state.session.clone(),
            revision: state.revision,
        }
    }

    /// Текущий токен.
    pub fn token(&self) -> Option<String> {
        self.state().session.token.clone()
    }

    /// Текущий пользователь.
    pub fn user(&self) -> Option<User> {
        self.state().session.user.clone()
    }

    /// Заменяет пользователя и токен одной записью.
    ///
    /// Пустой токен отклоняется с `Unauthenticated`, сессия не меняется.
    pub fn set_auth(&self, user: User, token: impl Into<String>) -> VersaClientResult<()> {
        let session = Session::authenticated(user, token.into())?;
        let mut state = self.state();
        self.write(&mut state, session)
    }

    /// Как `set_auth`, но только если с ревизии `revision` сессию никто не менял.
    pub fn set_auth_if_current(
        &self,
        revision: u64,
        user: User,
        token: impl Into<String>,
    ) -> VersaClientResult<()> {
        let session = Session::authenticated(user, token.into())?;
        let mut state = self.state();
        if state.revision != revision {
            return Err(VersaClientError::StaleSession);
        }
        self.write(&mut state, session)
    }

    /// Сбрасывает сессию.
    pub fn clear_auth(&self) -> VersaClientResult<()> {
        let mut state = self.state();
        self.write(&mut state, Session::default())
    }

    fn write(&self, state: &mut State, session: Session) -> VersaClientResult<()> {
        if session.is_authenticated() {
            let raw = serde_json::to_string(&session)?;
            self.storage.set_item(SESSION_STORAGE_KEY, &raw)?;
        } else {
            self.storage.remove_item(SESSION_STORAGE_KEY)?;
        }

        state.session = session;
        state.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn sample_user(credits: i64) -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            credits,
            role: Role::User,
        }
    }

    /// Делит одно `MemoryStorage` между несколькими `SessionStore`,
    /// имитируя перезагрузку процесса.
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl SessionStorage for SharedStorage {
        fn get_item(&self, key: &str) -> io::Result<Option<String>> {
            self.0.get_item(key)
        }
        fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
            self.0.set_item(key, value)
        }
        fn remove_item(&self, key: &str) -> io::Result<()> {
            self.0.remove_item(key)
        }
    }

    fn unique_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock must be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("versa-session-{nanos}"))
    }

    #[test]
    fn set_auth_survives_reload() {
        let storage = SharedStorage::default();
        let store = SessionStore::open(storage.clone()).expect("open");
        store.set_auth(sample_user(100), "jwt-1").expect("set_auth");

        let reloaded = SessionStore::open(storage).expect("reopen");
        assert_eq!(reloaded.session(), store.session());
        assert_eq!(reloaded.token().as_deref(), Some("jwt-1"));
        assert_eq!(reloaded.user().map(|u| u.credits), Some(100));
    }

    #[test]
    fn clear_auth_removes_persisted_entry() {
        let storage = SharedStorage::default();
        let store = SessionStore::open(storage.clone()).expect("open");
        store.set_auth(sample_user(100), "jwt-1").expect("set_auth");
        store.clear_auth().expect("clear_auth");

        assert!(storage.get_item(SESSION_STORAGE_KEY).expect("read").is_none());
        let reloaded = SessionStore::open(storage).expect("reopen");
        assert!(!reloaded.session().is_authenticated());
        assert!(reloaded.user().is_none());
    }

    #[test]
    fn malformed_storage_falls_back_to_empty_session() {
        let storage = SharedStorage::default();
        storage.set_item(SESSION_STORAGE_KEY, "{not-json}").expect("seed");

        let store = SessionStore::open(storage).expect("open");
        assert_eq!(store.session(), Session::default());
    }

    #[test]
    fn half_populated_storage_falls_back_to_empty_session() {
        let storage = SharedStorage::default();
        storage
            .set_item(SESSION_STORAGE_KEY, r#"{"user":null,"token":"jwt"}"#)
            .expect("seed");

        let store = SessionStore::open(storage).expect("open");
        assert!(store.token().is_none());
    }

    #[test]
    fn set_auth_rejects_blank_token() {
        let storage = SharedStorage::default();
        let store = SessionStore::open(storage.clone()).expect("open");
        let before = store.snapshot();

        for token in ["", "   "] {
            let err = store.set_auth(sample_user(100), token).expect_err("must reject");
            assert!(matches!(err, VersaClientError::Unauthenticated));
        }
        let err = store
            .set_auth_if_current(before.revision, sample_user(100), "")
            .expect_err("must reject");
        assert!(matches!(err, VersaClientError::Unauthenticated));

        assert_eq!(store.snapshot(), before);
        assert!(storage.get_item(SESSION_STORAGE_KEY).expect("read").is_none());
    }

    #[test]
    fn blank_token_in_storage_is_rejected() {
        let raw = r#"{"user":{"id":"u1","email":"a@b.com","credits":1,"role":"USER"},"token":"  "}"#;
        assert!(parse_session(raw).is_none());
    }

    #[test]
    fn stale_revision_write_is_rejected() {
        let store = SessionStore::in_memory();
        store.set_auth(sample_user(100), "jwt-1").expect("set_auth");
        let seen = store.snapshot();

        store.clear_auth().expect("logout in between");

        let err = store
            .set_auth_if_current(seen.revision, sample_user(90), "jwt-1")
            .expect_err("must reject");
        assert!(matches!(err, VersaClientError::StaleSession));
        assert!(store.token().is_none());
    }

    #[test]
    fn current_revision_write_is_applied() {
        let store = SessionStore::in_memory();
        store.set_auth(sample_user(100), "jwt-1").expect("set_auth");
        let seen = store.snapshot();

        store
            .set_auth_if_current(seen.revision, sample_user(90), "jwt-1")
            .expect("must apply");
        let now = store.snapshot();
        assert_eq!(now.revision, seen.revision + 1);
        assert_eq!(now.session.user().map(|u| u.credits), Some(90));
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = unique_dir();
        let store = SessionStore::open(FileStorage::new(&dir)).expect("open");
        store.set_auth(sample_user(42), "jwt-file").expect("set_auth");

        let raw = fs::read_to_string(dir.join("auth-storage.json")).expect("file exists");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["token"], "jwt-file");
        assert_eq!(value["user"]["credits"], 42);

        let reloaded = SessionStore::open(FileStorage::new(&dir)).expect("reopen");
        assert_eq!(reloaded.token().as_deref(), Some("jwt-file"));

        reloaded.clear_auth().expect("clear");
        assert!(!dir.join("auth-storage.json").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_storage_missing_dir_reads_as_empty() {
        let storage = FileStorage::new(unique_dir());
        assert!(storage.get_item(SESSION_STORAGE_KEY).expect("read").is_none());
        storage.remove_item(SESSION_STORAGE_KEY).expect("remove is idempotent");
    }
}
