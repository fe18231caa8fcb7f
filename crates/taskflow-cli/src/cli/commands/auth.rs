//! Account command handlers.

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use taskflow_core::{FileCredentialStore, Registration, Taskflow};

type App = Taskflow<FileCredentialStore>;

/// Fills in secrets not given as flags, one stdin line each.
struct SecretReader {
    lines: io::Lines<io::StdinLock<'static>>,
    interactive: bool,
}

impl SecretReader {
    fn new() -> Self {
        let stdin = io::stdin();
        Self {
            interactive: stdin.is_terminal(),
            lines: stdin.lines(),
        }
    }

    fn resolve(&mut self, given: Option<String>, label: &str, flag: &str) -> Result<String> {
        if let Some(value) = given {
            return Ok(value);
        }
        if self.interactive {
            eprint!("{label}: ");
            io::stderr().flush().ok();
        }
        match self.lines.next() {
            Some(line) => Ok(line.context("read stdin")?.trim_end_matches('\r').to_string()),
            None => bail!("{label} is required (pass --{flag} or pipe it on stdin)"),
        }
    }
}

pub async fn register(
    app: &App,
    name: String,
    email: String,
    password: Option<String>,
    confirm_password: Option<String>,
) -> Result<()> {
    let mut secrets = SecretReader::new();
    let password = secrets.resolve(password, "Password", "password")?;
    let confirm_password =
        secrets.resolve(confirm_password, "Confirm password", "confirm-password")?;

    let registration = Registration {
        name,
        email,
        password,
        confirm_password,
    };
    let receipt = app.sign_up(&registration).await?;

    if let Some(message) = receipt.message {
        println!("{message}");
    }
    println!(
        "Check {} for a 6-digit code, then run `taskflow verify <CODE>`.",
        registration.email.trim()
    );
    Ok(())
}

pub async fn verify(app: &App, otp: &str) -> Result<()> {
    let session = app.confirm_sign_up(otp).await?;
    println!(
        "Welcome, {}! You are now logged in.",
        session.user.display_name
    );
    Ok(())
}

pub async fn login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let password = SecretReader::new().resolve(password, "Password", "password")?;
    let session = app.sign_in(email, &password).await?;
    println!(
        "Logged in as {} <{}>",
        session.user.display_name, session.user.email
    );
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    let was_logged_in = app.session().current().is_some();
    app.sign_out().await?;
    if was_logged_in {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn whoami(app: &App) {
    let status = app.session().status();
    match status.user() {
        Some(user) => println!("{} <{}>", user.display_name, user.email),
        None => println!("Not logged in."),
    }
}
