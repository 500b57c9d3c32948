//! Authentication endpoints

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::User;
use crate::session::TokenGrant;

use super::{ApiClient, RequestOptions};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `POST /auth/login` response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// The logged in user
    pub user: User,
    /// Issued tokens
    #[serde(flatten)]
    pub grant: TokenGrant,
}

impl ApiClient {
    /// Log in and establish the session
    ///
    /// Sent without a bearer token; a 401 here is a plain API error.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        let response: LoginResponse = self
            .request(
                Method::POST,
                "/auth/login",
                Some(body),
                RequestOptions::anonymous(),
            )
            .await?;

        self.session().establish(&response.grant)?;
        tracing::info!(user_id = response.user.id, "Logged in");

        Ok(response.user)
    }

    /// Create an account; the response shape is backend-defined
    pub async fn register<B: Serialize + ?Sized>(&self, form: &B) -> Result<Value> {
        self.request(
            Method::POST,
            "/auth/register",
            Some(serde_json::to_value(form)?),
            RequestOptions::anonymous(),
        )
        .await
    }

    /// Drop the session locally (no server call)
    pub fn logout(&self) -> Result<()> {
        self.session().logout()
    }

    /// Restore a session from the stored refresh token
    pub async fn restore_session(&self) -> bool {
        self.session().init().await
    }

    /// The current user
    pub async fn me(&self) -> Result<User> {
        self.get("/me").await
    }

    /// Mark onboarding as done
    pub async fn complete_onboarding(&self) -> Result<()> {
        let _: IgnoredAny = self.patch("/me/onboarding", None).await?;
        Ok(())
    }
}
