use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::client::{BackendClient, ensure_success};
use crate::error::{
    BackendResult, DecodeResponseSnafu, ReadResponseBodySnafu, SendRequestSnafu,
};

/// Signed-in identity snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Wire shape of the auth provider's token endpoint response. Extra fields
/// (token_type, expires_in, ...) are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: TokenResponseUser,
}

#[derive(Debug, Deserialize)]
struct TokenResponseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// REST consumer for the hosted auth provider.
///
/// The current session is published through an `ArcSwapOption` so request
/// paths (the REST store) can read the bearer token without locking.
pub struct AuthClient {
    client: BackendClient,
    session: Arc<ArcSwapOption<Session>>,
}

impl AuthClient {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            session: Arc::new(ArcSwapOption::const_empty()),
        }
    }

    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    /// Shared read handle for collaborators that attach the bearer token.
    pub fn session_handle(&self) -> Arc<ArcSwapOption<Session>> {
        Arc::clone(&self.session)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<Arc<Session>> {
        self.request_token(
            "auth-password-grant",
            "password",
            &PasswordGrant { email, password },
        )
        .await
    }

    /// Restores a session from a cached refresh token.
    pub async fn restore_with_refresh_token(
        &self,
        refresh_token: &str,
    ) -> BackendResult<Arc<Session>> {
        self.request_token(
            "auth-refresh-grant",
            "refresh_token",
            &RefreshGrant { refresh_token },
        )
        .await
    }

    /// Clears the local session and revokes it with the provider.
    ///
    /// The local snapshot is cleared before the remote call so the rest of
    /// the app observes the sign-out even when revocation fails; callers log
    /// the returned error and nothing else.
    pub async fn sign_out(&self) -> BackendResult<()> {
        let Some(session) = self.session.swap(None) else {
            return Ok(());
        };

        let stage = "auth-sign-out";
        let response = self
            .client
            .http()
            .post(self.client.auth_url("logout"))
            .header("apikey", self.client.api_key())
            .bearer_auth(&session.access_token)
            .send()
            .await
            .context(SendRequestSnafu { stage })?;

        ensure_success(stage, response).await?;
        Ok(())
    }

    async fn request_token<B: Serialize>(
        &self,
        stage: &'static str,
        grant_type: &str,
        body: &B,
    ) -> BackendResult<Arc<Session>> {
        let mut url = self.client.auth_url("token");
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.api_key())
            .json(&body)
            .send()
            .await
            .context(SendRequestSnafu { stage })?;

        let response = ensure_success(stage, response).await?;
        let payload = response
            .text()
            .await
            .context(ReadResponseBodySnafu { stage })?;
        let wire: TokenResponse =
            serde_json::from_str(&payload).context(DecodeResponseSnafu { stage })?;

        Ok(self.publish(wire))
    }

    fn publish(&self, wire: TokenResponse) -> Arc<Session> {
        let session = Arc::new(Session {
            access_token: wire.access_token,
            refresh_token: wire.refresh_token,
            user: SessionUser {
                id: wire.user.id,
                email: wire.user.email.unwrap_or_default(),
            },
        });

        self.session.store(Some(Arc::clone(&session)));
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        BackendClient::new("https://example.supabase.co", "anon-key").unwrap()
    }

    #[test]
    fn token_response_tolerates_extra_fields_and_missing_email() {
        let wire: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "at",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "rt",
                "user": { "id": "user-1", "role": "authenticated" }
            }"#,
        )
        .unwrap();

        let auth = AuthClient::new(client());
        let session = auth.publish(wire);

        assert_eq!(session.access_token, "at");
        assert_eq!(session.refresh_token, "rt");
        assert_eq!(session.user.id, "user-1");
        assert_eq!(session.user.email, "");
    }

    #[test]
    fn publishing_makes_the_session_visible_through_the_handle() {
        let auth = AuthClient::new(client());
        let handle = auth.session_handle();
        assert!(handle.load_full().is_none());

        auth.publish(
            serde_json::from_str(
                r#"{"access_token":"at","refresh_token":"rt","user":{"id":"u","email":"a@b.pl"}}"#,
            )
            .unwrap(),
        );

        let visible = handle.load_full().unwrap();
        assert_eq!(visible.user.email, "a@b.pl");
        assert_eq!(auth.current_session().unwrap().user.id, "u");
    }

    #[tokio::test]
    async fn sign_out_without_a_session_is_a_no_op() {
        let auth = AuthClient::new(client());

        auth.sign_out().await.unwrap();
        assert!(auth.current_session().is_none());
    }
}
