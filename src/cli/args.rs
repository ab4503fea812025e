use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gmail-draft")]
#[command(about = "Create Gmail drafts from the command line", long_about = None)]
pub struct Cli {
    /// Print the authorization URL without opening a browser
    #[arg(long, global = true)]
    pub no_browser: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a plaintext message and save it as a draft
    Draft {
        /// Recipient address(es), comma separated; "Name <email>" is accepted
        #[arg(short, long)]
        to: String,

        /// Subject line
        #[arg(short, long)]
        subject: String,

        /// Plaintext body
        #[arg(short, long)]
        body: String,
    },

    /// Manage the stored OAuth token
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Discard the stored token and authorize again
    Login,

    /// Delete the stored token
    Reset,

    /// Show whether the stored token is usable
    Status,
}
