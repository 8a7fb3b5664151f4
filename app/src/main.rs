//! ChatAI console client.
//!
//! Drives the application store from stdin, one command per line, and prints
//! the current screen and any pending notifications after each command.

use anyhow::Context;
use chatai_app::{AppAction, AppReducer, AppState, AuthTab, FormAction, RouterAction, Screen};
use chatai_auth::providers::GoTrueProvider;
use chatai_auth::{AuthAction, AuthContext, AuthSettings, ProviderConfig};
use chatai_runtime::Store;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EFFECT_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const HELP: &str = "\
commands:
  start | back | logout          navigate
  tab signin|signup              switch form tab
  email <v> | password <v>       edit inputs
  name <v> | confirm <v>
  show                           toggle password visibility
  signin | signup | reset        submit
  quit";

type AppStore = Store<AppState, AppAction, AuthContext<GoTrueProvider>, AppReducer<GoTrueProvider>>;

fn parse(line: &str) -> Result<Option<AppAction>, String> {
    let (command, value) = line
        .split_once(' ')
        .map_or((line, ""), |(command, value)| (command, value.trim()));

    let action = match command {
        "start" => AppAction::Router(RouterAction::GetStarted),
        "back" => AppAction::Router(RouterAction::Back),
        "logout" => AppAction::Router(RouterAction::Logout),
        "tab" => match value {
            "signin" => AppAction::Form(FormAction::TabChanged(AuthTab::SignIn)),
            "signup" => AppAction::Form(FormAction::TabChanged(AuthTab::SignUp)),
            other => return Err(format!("unknown tab: {other}")),
        },
        "email" => AppAction::Form(FormAction::EmailChanged(value.to_string())),
        "password" => AppAction::Form(FormAction::PasswordChanged(value.to_string())),
        "name" => AppAction::Form(FormAction::FullNameChanged(value.to_string())),
        "confirm" => AppAction::Form(FormAction::ConfirmPasswordChanged(value.to_string())),
        "show" => AppAction::Form(FormAction::TogglePasswordVisibility),
        "signin" => AppAction::Form(FormAction::SubmitSignIn),
        "signup" => AppAction::Form(FormAction::SubmitSignUp),
        "reset" => AppAction::Form(FormAction::SubmitReset),
        "" | "help" => return Ok(None),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(action))
}

async fn render(store: &AppStore) -> anyhow::Result<()> {
    let (screen, tab, notifications) = store
        .state(|s| {
            (
                s.screen(),
                s.form.tab,
                s.form.notifications.iter().cloned().collect::<Vec<_>>(),
            )
        })
        .await;

    match screen {
        Screen::Loading => println!("[loading]"),
        Screen::Landing => println!("[landing] type `start` to sign in"),
        Screen::Auth => println!("[auth] tab: {tab:?}"),
        Screen::Chat(identity) => println!(
            "[chat] {} <{}> id={} avatar={}",
            identity.name, identity.email, identity.id, identity.image
        ),
    }

    if !notifications.is_empty() {
        for notification in &notifications {
            let marker = if notification.is_error() { "!" } else { "*" };
            println!("  {marker} {}: {}", notification.title, notification.description);
        }
        store
            .send(AppAction::Form(FormAction::NotificationsShown {
                count: notifications.len(),
            }))
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatai_app=debug,chatai_auth=debug,chatai_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = AuthSettings::from_env().context("invalid application settings")?;
    let provider = ProviderConfig::from_env()
        .context("invalid provider configuration")?
        .map(GoTrueProvider::new)
        .transpose()
        .context("failed to create identity provider client")?;

    let context = AuthContext::from_provider(provider, settings);
    if let Err(error) = context.init().await {
        tracing::warn!(%error, "Provider initialization failed");
    }

    let store: AppStore = Store::new(AppState::default(), AppReducer::new(), context);

    println!("=== ChatAI ===\n{HELP}\n");
    let mut handle = store.send(AppAction::Auth(AuthAction::Mount)).await?;
    handle.wait_with_timeout(EFFECT_TIMEOUT).await?;
    render(&store).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "quit" {
            break;
        }
        match parse(line) {
            Ok(Some(action)) => {
                let mut handle = store.send(action).await?;
                if let Err(error) = handle.wait_with_timeout(EFFECT_TIMEOUT).await {
                    tracing::warn!(%error, "Command did not finish in time");
                }
            },
            Ok(None) => println!("{HELP}"),
            Err(message) => println!("{message}"),
        }
        render(&store).await?;
    }

    store.send(AppAction::Auth(AuthAction::Unmount)).await?;
    store.shutdown(SHUTDOWN_TIMEOUT).await?;
    store.environment().dispose().await;
    Ok(())
}
