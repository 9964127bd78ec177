use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use asystent_backend::{AuthClient, Session};
use gpui::*;
use gpui_tokio_bridge::Tokio;
use snafu::{ResultExt, Snafu};
use uuid::Uuid;

const CACHE_REFRESH_TOKEN_KEY: &str = "refresh_token";
const SIGN_IN_FAILED_MESSAGE: &str = "Logowanie nie powiodło się. Sprawdź dane i spróbuj ponownie.";

/// Opaque identifier grouping one login's messages into one transcript.
///
/// Minted once per login event. The millisecond prefix keeps identifiers
/// roughly sortable; the random suffix makes collisions negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn generate() -> Self {
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis());
        let random = Uuid::new_v4().simple().to_string();

        Self(format!("chat_{unix_millis}_{}", &random[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Signed-in state: the provider session plus the conversation minted for it.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session: Arc<Session>,
    pub conversation_id: ConversationId,
}

/// Pure login-lifecycle state, kept free of UI types so the transition rules
/// are testable.
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    active: Option<ActiveSession>,
}

impl SessionLifecycle {
    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    /// Applies a signed-in session. A conversation identifier is minted only
    /// on the unauthenticated -> authenticated transition; refreshing the
    /// session of an already signed-in user keeps the running conversation.
    pub fn apply_signed_in(&mut self, session: Arc<Session>) {
        match &mut self.active {
            Some(active) => active.session = session,
            None => {
                self.active = Some(ActiveSession {
                    session,
                    conversation_id: ConversationId::generate(),
                });
            }
        }
    }

    pub fn apply_signed_out(&mut self) {
        self.active = None;
    }
}

#[derive(Debug, Snafu)]
pub enum SessionCacheError {
    #[snafu(display("failed to create session cache directory at {path}"))]
    CreateCacheDirectory {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to write session cache to {path}"))]
    WriteCache {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to remove session cache at {path}"))]
    RemoveCache {
        path: String,
        source: std::io::Error,
    },
}

/// Key=value file holding the refresh token between runs, so a restart can
/// restore the session without asking for credentials again.
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("asystent")
            .join("session.conf")
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load_refresh_token(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=')
                && key.trim() == CACHE_REFRESH_TOKEN_KEY
            {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }

        None
    }

    pub fn store_refresh_token(&self, token: &str) -> Result<(), SessionCacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateCacheDirectorySnafu {
                path: display_path(parent),
            })?;
        }

        let content = format!("# Asystent session cache\n{CACHE_REFRESH_TOKEN_KEY}={token}\n");
        std::fs::write(&self.path, content).context(WriteCacheSnafu {
            path: display_path(&self.path),
        })
    }

    pub fn clear(&self) -> Result<(), SessionCacheError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(RemoveCacheSnafu {
                path: display_path(&self.path),
            }),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Emitted on every authenticated/unauthenticated transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChanged;

/// Emitted towards the login view when a sign-in attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInFailed {
    pub message: String,
}

/// Owns authentication state for the lifetime of the app.
///
/// All sign-in/sign-out flows go through this entity, which is what keeps the
/// one-conversation-per-login rule enforceable in a single place.
pub struct SessionManager {
    auth: Arc<AuthClient>,
    cache: SessionCache,
    lifecycle: SessionLifecycle,
}

impl EventEmitter<SessionChanged> for SessionManager {}
impl EventEmitter<SignInFailed> for SessionManager {}

impl SessionManager {
    pub fn new(auth: Arc<AuthClient>, cache: SessionCache) -> Self {
        Self {
            auth,
            cache,
            lifecycle: SessionLifecycle::default(),
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.lifecycle.active()
    }

    /// Attempts to restore the previous session from the cached refresh
    /// token. Failures leave the app at the login view and are only logged.
    pub fn restore(&mut self, cx: &mut Context<Self>) {
        let Some(refresh_token) = self.cache.load_refresh_token() else {
            return;
        };

        let auth = Arc::clone(&self.auth);
        let task = Tokio::spawn(cx, async move {
            auth.restore_with_refresh_token(&refresh_token).await
        });

        cx.spawn(async move |this, cx| {
            let outcome = task.await;
            let _ = this.update(cx, |this, cx| match outcome {
                Ok(Ok(session)) => this.finish_sign_in(session, cx),
                Ok(Err(error)) => {
                    tracing::warn!("session restore failed: {error}");
                }
                Err(_) => {}
            });
        })
        .detach();
    }

    pub fn sign_in(&mut self, email: String, password: String, cx: &mut Context<Self>) {
        let auth = Arc::clone(&self.auth);
        let task = Tokio::spawn(cx, async move {
            auth.sign_in_with_password(&email, &password).await
        });

        cx.spawn(async move |this, cx| {
            let outcome = task.await;
            let _ = this.update(cx, |this, cx| match outcome {
                Ok(Ok(session)) => this.finish_sign_in(session, cx),
                Ok(Err(error)) => {
                    tracing::warn!("sign-in failed: {error}");
                    cx.emit(SignInFailed {
                        message: SIGN_IN_FAILED_MESSAGE.to_string(),
                    });
                }
                Err(_) => {}
            });
        })
        .detach();
    }

    /// Clears the session locally, revokes it remotely and drops the cached
    /// refresh token. The remote revocation is best effort.
    pub fn sign_out(&mut self, cx: &mut Context<Self>) {
        if self.lifecycle.active().is_none() {
            return;
        }

        if let Err(error) = self.cache.clear() {
            tracing::warn!("failed to clear session cache: {error}");
        }

        self.lifecycle.apply_signed_out();

        let auth = Arc::clone(&self.auth);
        Tokio::spawn(cx, async move {
            if let Err(error) = auth.sign_out().await {
                tracing::warn!("sign-out request failed: {error}");
            }
        })
        .detach();

        cx.emit(SessionChanged);
        cx.notify();
    }

    fn finish_sign_in(&mut self, session: Arc<Session>, cx: &mut Context<Self>) {
        if let Err(error) = self.cache.store_refresh_token(&session.refresh_token) {
            tracing::warn!("failed to cache refresh token: {error}");
        }

        self.lifecycle.apply_signed_in(session);
        cx.emit(SessionChanged);
        cx.notify();
    }
}
