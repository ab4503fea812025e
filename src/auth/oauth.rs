use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::GMAIL_COMPOSE_SCOPE;
use super::credentials::Authorizer;
use super::secrets::ClientSecrets;
use super::token::StoredToken;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/html; charset=utf-8\r\n\
    Connection: close\r\n\r\n\
    <html><body>\
    <h1>Authorization successful</h1>\
    <p>The authentication flow has completed. You may close this window.</p>\
    </body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\n\
    Content-Type: text/html; charset=utf-8\r\n\
    Connection: close\r\n\r\n\
    <html><body>\
    <h1>Authorization failed</h1>\
    <p>Return to the terminal for details.</p>\
    </body></html>";

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

/// Create OAuth2 client
pub fn create_oauth_client(
    client_id: &str,
    client_secret: &str,
    auth_url: &str,
    token_url: &str,
) -> Result<BasicClient> {
    let client = BasicClient::new(
        ClientId::new(client_id.to_string()),
        Some(ClientSecret::new(client_secret.to_string())),
        AuthUrl::new(auth_url.to_string()).context("Invalid authorization URL")?,
        Some(TokenUrl::new(token_url.to_string()).context("Invalid token URL")?),
    );

    Ok(client)
}

/// Authorization response delivered to the loopback listener
#[derive(Debug)]
pub struct Callback {
    pub code: AuthorizationCode,
    pub state: CsrfToken,
}

/// Parse the request line of the redirect back from Google.
///
/// Returns `Ok(None)` for requests that carry no authorization response
/// (e.g. `/favicon.ico`), so the caller can keep waiting.
pub fn parse_callback(request_line: &str) -> Result<Option<Callback>> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Invalid HTTP request")?;

    let url = url::Url::parse(&format!("http://localhost{}", target))
        .context("Invalid callback URL")?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        anyhow::bail!("Authorization was denied: {}", error);
    }

    let Some(code) = param("code") else {
        return Ok(None);
    };

    let state = param("state").context("State not found in callback")?;

    Ok(Some(Callback {
        code: AuthorizationCode::new(code),
        state: CsrfToken::new(state),
    }))
}

/// Build a persisted token from a token endpoint response.
///
/// Google omits the refresh token (and sometimes the scopes) on refresh, so
/// those fall back to the previous values.
fn token_from_response(
    response: &BasicTokenResponse,
    client_id: &str,
    client_secret: &str,
    token_uri: &str,
    previous_refresh: Option<String>,
    previous_scopes: Vec<String>,
) -> StoredToken {
    let expiry = response
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .and_then(|d| chrono::Utc::now().checked_add_signed(d));

    let scopes = response
        .scopes()
        .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
        .unwrap_or(previous_scopes);

    StoredToken {
        access_token: Some(response.access_token().secret().clone()),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        token_uri: token_uri.to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        scopes,
        expiry,
    }
}

/// Redirect target for the loopback listener, which only binds IPv4
pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

/// Talks to Google's OAuth endpoints: token refresh and the installed-app
/// loopback flow.
#[derive(Debug, Clone)]
pub struct GoogleAuthorizer {
    callback_port: u16,
    open_browser: bool,
}

impl GoogleAuthorizer {
    pub fn new(open_browser: bool) -> Self {
        Self {
            // Ephemeral port, picked by the OS
            callback_port: 0,
            open_browser,
        }
    }

    /// Wait for the browser redirect and answer it
    async fn receive_callback(&self, listener: &TcpListener) -> Result<Callback> {
        loop {
            let (mut stream, peer) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            debug!("Callback connection from {}", peer);

            let mut request_line = String::new();
            BufReader::new(&mut stream)
                .read_line(&mut request_line)
                .await
                .context("Failed to read callback request")?;

            match parse_callback(&request_line) {
                Ok(Some(callback)) => {
                    stream.write_all(SUCCESS_PAGE.as_bytes()).await?;
                    return Ok(callback);
                }
                Ok(None) => {
                    stream.write_all(NOT_FOUND.as_bytes()).await?;
                }
                Err(e) => {
                    stream.write_all(FAILURE_PAGE.as_bytes()).await.ok();
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl Authorizer for GoogleAuthorizer {
    /// Refresh an expired token
    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let refresh = token
            .refresh_token
            .as_deref()
            .context("Token has no refresh token")?;

        info!("Refreshing expired token...");
        let client = create_oauth_client(
            &token.client_id,
            &token.client_secret,
            GOOGLE_AUTH_URL,
            &token.token_uri,
        )?;

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh.to_string()))
            .request_async(async_http_client)
            .await
            .context("Failed to refresh token")?;

        info!("Token refreshed successfully");
        Ok(token_from_response(
            &response,
            &token.client_id,
            &token.client_secret,
            &token.token_uri,
            token.refresh_token.clone(),
            token.scopes.clone(),
        ))
    }

    /// Perform OAuth2 authorization flow
    async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredToken> {
        let listener = TcpListener::bind(("127.0.0.1", self.callback_port))
            .await
            .context("Failed to bind local callback listener")?;
        let port = listener.local_addr()?.port();

        let client = create_oauth_client(
            &secrets.client_id,
            &secrets.client_secret,
            &secrets.auth_uri,
            &secrets.token_uri,
        )?
        .set_redirect_uri(RedirectUrl::new(redirect_uri(port))?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(GMAIL_COMPOSE_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Please visit this URL to authorize this application: {}", auth_url);

        if self.open_browser {
            if let Err(e) = webbrowser::open(auth_url.as_str()) {
                warn!("Failed to open browser automatically: {}", e);
            }
        }

        let callback = self.receive_callback(&listener).await?;

        // Verify CSRF token
        if callback.state.secret() != csrf_token.secret() {
            anyhow::bail!("CSRF token mismatch");
        }

        // Exchange code for token
        let response = client
            .exchange_code(callback.code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .context("Failed to exchange authorization code for token")?;

        Ok(token_from_response(
            &response,
            &secrets.client_id,
            &secrets.client_secret,
            &secrets.token_uri,
            None,
            vec![GMAIL_COMPOSE_SCOPE.to_string()],
        ))
    }
}
