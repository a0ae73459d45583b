//! Interactive Azure AD login from the terminal.
//!
//! Set `AZURE__CLIENT_ID`, `AZURE__REDIRECT_URI`, `AZURE__SCOPES` (space
//! separated) and optionally `AZURE__CLIENT_SECRET` and `AZURE_TENANT`, either
//! in the environment or in a `.env` file. Then:
//!
//! ```sh
//! cargo run -p ras-oauth2-engine --example azure_login
//! ```
//!
//! Open the printed URL, sign in, and paste the full URL you were redirected
//! to back into the terminal.

use anyhow::{Context, Result, bail};
use ras_oauth2_engine::providers::AzureAdapter;
use ras_oauth2_engine::{
    AuthorizationResponse, CancellationToken, OAuth2ClientConfig, OAuth2Engine,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = OAuth2ClientConfig::from_env("AZURE").context("Failed to load client configuration")?;
    let tenant = std::env::var("AZURE_TENANT").unwrap_or_else(|_| "common".to_string());
    let adapter = AzureAdapter::new(tenant);
    let engine = OAuth2Engine::with_http_timeout(Duration::from_secs(30))?;

    let (login_url, attempt) = engine.build_login_url(&config, &adapter, true, &[])?;
    println!("\nOpen this URL in a browser:\n\n{login_url}\n");
    print!("Paste the redirect URL: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let redirected = Url::parse(line.trim()).context("Not a valid URL")?;

    let mut callback = AuthorizationResponse {
        code: String::new(),
        state: String::new(),
        error: None,
        error_description: None,
    };
    for (key, value) in redirected.query_pairs() {
        match key.as_ref() {
            "code" => callback.code = value.into_owned(),
            "state" => callback.state = value.into_owned(),
            "error" => callback.error = Some(value.into_owned()),
            "error_description" => callback.error_description = Some(value.into_owned()),
            _ => {}
        }
    }
    if callback.state.is_empty() {
        bail!("redirect URL carries no state parameter");
    }

    // Ctrl-C aborts whichever request is in flight.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let token = engine
        .handle_callback(attempt, &callback, &config, &adapter, &cancel)
        .await?;
    info!("Token expires at {:?}", token.expires_at);

    let profile = engine.fetch_user_profile(&token, &adapter, &cancel).await?;
    println!("\n{}", serde_json::to_string_pretty(&profile)?);

    Ok(())
}
