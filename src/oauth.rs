use crate::config::Scope;
use crate::credentials::StoredCredentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use oauth2::basic::{
    BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
    BasicTokenIntrospectionResponse, BasicTokenResponse,
};
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, Scope as OauthScope, StandardRevocableToken,
    TokenResponse, TokenUrl,
};
use reqwest::redirect::Policy;
use std::path::Path;
use tracing::debug;
use url::Url;
use yup_oauth2::ApplicationSecret;

/// Access type requested from Google so a refresh token is issued.
const ACCESS_TYPE: &str = "offline";

/// Redirect for the out-of-band copy/paste flow when the client secret does
/// not name one.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Access token lifetime assumed when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// The OAuth exchanges the wrapper needs: building a consent URL, turning an
/// authorization code into credentials, and refreshing an access token.
#[async_trait]
pub(crate) trait OAuthExchange: Send + Sync {
    fn authorization_url(&self) -> (Url, CsrfToken);

    async fn exchange_code(&self, code: &str) -> Result<StoredCredentials>;

    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredentials>;
}

/// [`OAuthExchange`] against the endpoints named in a Google
/// `client_secret.json`.
pub(crate) struct GoogleOAuth {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    scope: Scope,
}

impl GoogleOAuth {
    pub(crate) async fn from_secret_file(path: &Path, scope: Scope) -> Result<Self> {
        let secret = yup_oauth2::read_application_secret(path).await.map_err(|e| {
            Error::InvalidConfiguration(format!(
                "Failed to read client secret {:?}: {}",
                path, e
            ))
        })?;

        Self::from_application_secret(secret, scope)
    }

    pub(crate) fn from_application_secret(secret: ApplicationSecret, scope: Scope) -> Result<Self> {
        let auth_url = AuthUrl::new(secret.auth_uri)
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri)
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid token URL: {}", e)))?;
        let redirect_uri = secret
            .redirect_uris
            .into_iter()
            .next()
            .unwrap_or_else(|| OOB_REDIRECT_URI.to_string());

        let client = BasicClient::new(ClientId::new(secret.client_id))
            .set_client_secret(ClientSecret::new(secret.client_secret))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(RedirectUrl::new(redirect_uri).map_err(|e| {
                Error::InvalidConfiguration(format!("Invalid redirect URL: {}", e))
            })?);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            http_client,
            scope,
        })
    }

    /// Build a credential record from a token response.
    ///
    /// If `fallback_refresh_token` is provided, it will be used if the token
    /// response doesn't include a refresh token (common in refresh flows).
    fn credentials_from_response(
        token_result: BasicTokenResponse,
        fallback_refresh_token: Option<&str>,
    ) -> Result<StoredCredentials> {
        let access_token = token_result.access_token().secret().clone();

        let refresh_token = match token_result.refresh_token() {
            Some(token) => token.secret().clone(),
            None => match fallback_refresh_token {
                Some(fallback) => fallback.to_string(),
                None => return Err(Error::TokenRefresh("No refresh token received".to_string())),
            },
        };

        let expires_in = token_result
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = chrono::Utc::now().timestamp() + expires_in;

        Ok(StoredCredentials {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(expires_at),
            extra: Default::default(),
        })
    }
}

#[async_trait]
impl OAuthExchange for GoogleOAuth {
    fn authorization_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(OauthScope::new(self.scope.url().to_string()))
            .add_extra_param("access_type", ACCESS_TYPE)
            .add_extra_param("prompt", "consent")
            .url()
    }

    async fn exchange_code(&self, code: &str) -> Result<StoredCredentials> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| {
                Error::TokenRefresh(format!("Failed to exchange authorization code: {:?}", e))
            })?;

        Self::credentials_from_response(token_result, None)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredentials> {
        debug!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| Error::TokenRefresh(format!("Failed to refresh token: {:?}", e)))?;

        Self::credentials_from_response(token_result, Some(refresh_token))
    }
}
