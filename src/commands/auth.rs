//! Session commands: login, register, logout, whoami.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use taskflow::types::RegisterRequest;
use taskflow::Taskflow;

/// Arguments of `taskflow register`.
#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Account name
    pub username: String,

    /// Contact address
    #[arg(long)]
    pub email: String,

    /// Display name
    #[arg(long)]
    pub full_name: String,

    /// Password (prompted when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

/// Sign in.
pub async fn login(app: &Taskflow, username: String, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password)?;
    let session = app.login(&username, &password).await?;
    println!(
        "  {} Signed in as {} ({})",
        "✓".green(),
        session.full_name.bright_white().bold(),
        session.username
    );
    Ok(())
}

/// Create an account and sign in.
pub async fn register(app: &Taskflow, args: RegisterArgs) -> Result<()> {
    let request = RegisterRequest {
        username: args.username,
        email: args.email,
        password: password_or_prompt(args.password)?,
        full_name: args.full_name,
    };
    let session = app.register(&request).await?;
    println!(
        "  {} Account created; signed in as {}",
        "✓".green(),
        session.username.bright_white().bold()
    );
    Ok(())
}

/// Forget the session.
pub fn logout(app: &Taskflow) -> Result<()> {
    let was_signed_in = app.is_authenticated();
    app.logout()?;
    if was_signed_in {
        println!("  {} Signed out", "✓".green());
    } else {
        println!("  {} Not signed in", "→".blue());
    }
    Ok(())
}

/// Print the signed-in user.
pub fn whoami(app: &Taskflow) -> Result<()> {
    match app.current_user() {
        Some(user) => {
            println!("{}", user.full_name.bright_white().bold());
            println!("  Username: {}", user.username);
            println!("  Email:    {}", user.email);
            println!("  Id:       {}", user.user_id);
        },
        None => {
            println!("  {} Not signed in. Run: taskflow login <username>", "⚠".yellow());
        },
    }
    Ok(())
}
