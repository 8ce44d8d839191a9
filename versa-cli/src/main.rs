use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use versa_client::{
    AuthPayload, DEFAULT_POST_CREDITS, FileStorage, GoogleOAuthExchange, OAuthState, Post,
    SessionStore, User, VersaClient, VersaClientError,
};

mod logging;
mod settings;

use logging::init_logging;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "versa-cli", version, about = "CLI клиент для Versa GraphQL API")]
struct Cli {
    /// Адрес GraphQL-эндпоинта (по умолчанию VERSA_API_URL или production).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Подробнее логи клиента: `-v` debug, `-vv` trace.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Вход пользователя.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Вход через Google: callback-URL провайдера или сам код.
    Oauth {
        #[arg(long)]
        callback: String,
    },
    /// Выход: сессия очищается.
    Logout,
    /// Текущий пользователь (кредиты, роль). При ошибке сессия очищается.
    Me,
    /// Публикация поста (списывает кредиты).
    Create {
        #[arg(long)]
        content: String,
        #[arg(long, default_value_t = DEFAULT_POST_CREDITS)]
        credits: i64,
    },
    /// Изменение текста поста.
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        content: String,
    },
    /// Удаление поста (кредиты возвращаются).
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Свои посты.
    Posts,
    /// Все посты (только для администраторов).
    AllPosts,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level, cli.verbose)?;

    let endpoint = resolve_endpoint(cli.server, &settings.api_url);
    let session = SessionStore::open(FileStorage::new(&settings.session_dir))
        .context("не удалось прочитать сохранённую сессию")?;
    let client = VersaClient::new(settings.client_config(endpoint), Arc::new(session))
        .context("не удалось создать HTTP-клиент")?;
    info!(endpoint = client.endpoint(), "client ready");

    match cli.command {
        Command::Register { email, password } => {
            let auth = client
                .register(&email, &password)
                .await
                .map_err(map_client_error)?;
            persist_auth(&client, &auth)?;
            print_auth("Регистрация успешна", &auth);
        }
        Command::Login { email, password } => {
            let auth = client
                .login(&email, &password)
                .await
                .map_err(map_client_error)?;
            persist_auth(&client, &auth)?;
            print_auth("Вход выполнен", &auth);
        }
        Command::Oauth { callback } => {
            let mut exchange = oauth_exchange(&callback);
            match exchange.run(&client).await {
                OAuthState::Authenticated(user) => print_user("Вход через Google выполнен", user),
                OAuthState::Failed(message) => {
                    bail!("вход через Google не удался: {message}; повторите `versa-cli login ...`")
                }
                other => bail!("обмен OAuth-кода не завершён: {other:?}"),
            }
        }
        Command::Logout => {
            client
                .session()
                .clear_auth()
                .context("не удалось очистить сессию")?;
            println!("Сессия очищена");
        }
        Command::Me => {
            let user = refresh_current_user(&client).await?;
            print_user("Панель управления", &user);
        }
        Command::Create { content, credits } => {
            ensure_credits(client.session().user().as_ref(), credits)?;
            let payload = client
                .create_post_with_credits(&content, credits)
                .await
                .map_err(map_client_error)?;
            write_back_user(client.session(), payload.user.clone())?;
            if let Some(post) = &payload.post {
                print_post("Пост создан", post);
            }
            println!("Осталось кредитов: {}", payload.user.credits);
        }
        Command::Edit { id, content } => {
            let payload = client
                .edit_post(&id, &content)
                .await
                .map_err(map_client_error)?;
            write_back_user(client.session(), payload.user.clone())?;
            if let Some(post) = &payload.post {
                print_post("Пост обновлён", post);
            }
        }
        Command::Delete { id } => {
            let payload = client.delete_post(&id).await.map_err(map_client_error)?;
            write_back_user(client.session(), payload.user.clone())?;
            println!("Пост удалён: id={id}");
            println!("Кредиты после возврата: {}", payload.user.credits);
        }
        Command::Posts => {
            let posts = client.posts().await.map_err(map_client_error)?;
            print_list(&posts);
        }
        Command::AllPosts => {
            let posts = client.all_posts().await.map_err(map_client_error)?;
            print_list(&posts);
        }
    }

    Ok(())
}

fn resolve_endpoint(server: Option<String>, configured: &str) -> String {
    normalize_server(server.unwrap_or_else(|| configured.to_string()))
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

/// Callback-URL, если ввод на него похож: есть query-часть.
///
/// URL без схемы (`localhost:3000/callback?code=...`) дополняется `http://`,
/// иначе он целиком ушёл бы на сервер как код.
fn callback_url(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.contains('?') {
        return None;
    }
    Some(normalize_server(input.to_string()))
}

fn oauth_exchange(input: &str) -> GoogleOAuthExchange {
    match callback_url(input) {
        Some(url) => GoogleOAuthExchange::from_callback_url(&url),
        None => GoogleOAuthExchange::from_code(Some(input)),
    }
}

fn persist_auth(client: &VersaClient, auth: &AuthPayload) -> Result<()> {
    client
        .session()
        .set_auth(auth.user.clone(), auth.token.clone())
        .context("не удалось сохранить сессию")
}

/// Баланс проверяется по кэшу до запроса: с нехваткой кредитов запрос не уходит.
fn ensure_credits(user: Option<&User>, cost: i64) -> Result<()> {
    match user {
        Some(user) if !user.can_afford(cost) => Err(anyhow!(
            "недостаточно кредитов: баланс {}, требуется {cost}",
            user.credits
        )),
        _ => Ok(()),
    }
}

/// Кэш пользователя обновляется после мутации, меняющей кредиты.
///
/// Мутация возвращает владельца поста. Если это не вошедший пользователь
/// (администратор удалил чужой пост), кэш не трогается.
fn write_back_user(session: &SessionStore, user: User) -> Result<()> {
    let seen = session.snapshot();
    let (Some(cached), Some(token)) = (seen.session.user(), seen.session.token()) else {
        warn!("session was cleared while the request was in flight");
        return Ok(());
    };
    if cached.id != user.id {
        info!(cached = %cached.id, owner = %user.id, "mutation returned another user, cache kept");
        return Ok(());
    }

    match session.set_auth_if_current(seen.revision, user, token.to_string()) {
        Ok(()) => Ok(()),
        Err(VersaClientError::StaleSession) => {
            warn!("session changed during write-back, keeping the newer one");
            Ok(())
        }
        Err(err) => Err(anyhow!(err).context("не удалось обновить сессию")),
    }
}

async fn refresh_current_user(client: &VersaClient) -> Result<User> {
    let seen = client.session().snapshot();
    let Some(token) = seen.session.token().map(str::to_string) else {
        return Err(map_client_error(VersaClientError::Unauthenticated));
    };

    match client.me().await {
        Ok(user) => {
            match client
                .session()
                .set_auth_if_current(seen.revision, user.clone(), token)
            {
                Ok(()) => {}
                Err(VersaClientError::StaleSession) => {
                    warn!("session changed during refresh, keeping the newer one");
                }
                Err(err) => return Err(anyhow!(err).context("не удалось обновить сессию")),
            }
            Ok(user)
        }
        // сетевой сбой не разлогинивает
        Err(err) if err.is_transport() => Err(map_client_error(err)),
        Err(err) => {
            client
                .session()
                .clear_auth()
                .context("не удалось очистить сессию")?;
            Err(map_client_error(err)).context("сессия очищена, выполните вход заново")
        }
    }
}

fn map_client_error(err: VersaClientError) -> anyhow::Error {
    let message = match err {
        VersaClientError::Unauthenticated => {
            "требуется авторизация: выполните `versa-cli login ...` или `versa-cli register ...`"
                .to_string()
        }
        VersaClientError::Graphql(message) => format!("ошибка сервера: {message}"),
        VersaClientError::Http(err) => format!("ошибка HTTP: {err}"),
        VersaClientError::InvalidResponse(message) => {
            format!("некорректный ответ сервера: {message}")
        }
        VersaClientError::Storage(err) => format!("ошибка хранилища сессии: {err}"),
        VersaClientError::Serialization(err) => format!("ошибка сериализации сессии: {err}"),
        VersaClientError::StaleSession => "сессия изменилась во время запроса".to_string(),
    };
    anyhow!(message)
}

fn print_auth(title: &str, auth: &AuthPayload) {
    print_user(title, &auth.user);
    println!("token: {}", auth.token);
}

fn print_user(title: &str, user: &User) {
    println!("{title}");
    println!("  id: {}", user.id);
    println!("  email: {}", user.email);
    println!("  credits: {}", user.credits);
    println!("  role: {:?}", user.role);
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("content: {}", post.content);
    println!("credits_used: {}", post.credits_used);
    println!("created_at: {}", post.created_at);
    println!("updated_at: {}", post.updated_at);
}

fn print_list(posts: &[Post]) {
    println!("Постов: {}", posts.len());

    for post in posts {
        match &post.user {
            Some(author) => println!("- [{}] {} ({})", post.id, post.content, author.email),
            None => println!("- [{}] {}", post.id, post.content),
        }
    }
}
