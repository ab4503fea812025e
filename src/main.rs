mod auth;
mod cli;
mod config;
mod error;
mod gmail;
mod logging;

use anyhow::Result;
use auth::oauth::GoogleAuthorizer;
use auth::token::TokenState;
use clap::Parser;
use cli::args::{AuthAction, Cli, Commands};
use config::env::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    logging::init(&config)?;

    let authorizer = GoogleAuthorizer::new(!cli.no_browser);

    match cli.command {
        Commands::Draft { to, subject, body } => {
            gmail::draft::compose_draft(&config, &authorizer, &to, &subject, &body).await?;
        }
        Commands::Auth { action } => {
            handle_auth_command(&config, &authorizer, action).await?;
        }
    }

    Ok(())
}

async fn handle_auth_command(
    config: &Config,
    authorizer: &GoogleAuthorizer,
    action: AuthAction,
) -> Result<()> {
    match action {
        AuthAction::Login => {
            println!("🔄 Re-authenticating Gmail...\n");
            auth::token::clear_token(&config.token_path)?;
            auth::credentials::get_credentials(config, authorizer).await?;
            println!("\n✅ Gmail re-authenticated successfully!");
        }
        AuthAction::Reset => {
            if auth::token::clear_token(&config.token_path)? {
                println!("✓ Gmail token cleared");
            } else {
                println!("ℹ No Gmail token to clear");
            }
        }
        AuthAction::Status => {
            let state = auth::token::token_status(&config.token_path)?;
            let description = match state {
                TokenState::Missing => "no token stored, authorization required",
                TokenState::Valid => "valid",
                TokenState::Refreshable => "expired, will be refreshed on next use",
                TokenState::Expired => "expired, authorization required",
            };
            println!("Token {}: {}", config.token_path.display(), description);
        }
    }

    Ok(())
}
