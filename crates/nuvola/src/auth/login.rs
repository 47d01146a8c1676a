//! Interactive login collaborators
//!
//! `Login` turns a username and password into a session credential.
//! `CredentialPrompt` asks the user for a username and password when none
//! are configured.

use std::io::{BufRead, Write};
use std::time::Duration;

use log::debug;

use crate::config::LoginCredentials;
use crate::error::{Error, Result};

/// Obtains a session credential from a username and password
pub trait Login {
    fn login(&self, credentials: &LoginCredentials) -> Result<String>;
}

/// Asks the user for login credentials
pub trait CredentialPrompt {
    /// `None` means the user declined to log in
    fn prompt(&self) -> Result<Option<LoginCredentials>>;
}

/// Options for the web login form
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// URL the login form posts to
    pub login_url: String,
    pub username_field: String,
    pub password_field: String,
    /// Cookie carrying the session credential once logged in
    pub session_cookie: String,
    pub timeout: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            login_url: "https://nuvola.madisoft.it/login".to_string(),
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            session_cookie: "nuvola".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Logs in by posting the web login form and reading the session cookie
pub struct FormLogin {
    agent: ureq::Agent,
    options: LoginOptions,
}

impl FormLogin {
    pub fn new(options: LoginOptions) -> Self {
        // The session cookie is set on the redirect, so it must not be followed
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(Some(options.timeout))
            .build()
            .into();
        Self { agent, options }
    }
}

impl Login for FormLogin {
    fn login(&self, credentials: &LoginCredentials) -> Result<String> {
        debug!("Posting login form to {}", self.options.login_url);
        let response = self
            .agent
            .post(&self.options.login_url)
            .send_form([
                (self.options.username_field.as_str(), credentials.username.as_str()),
                (self.options.password_field.as_str(), credentials.password.as_str()),
            ])?;

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if is_login_page(location, &self.options.login_url) {
            return Err(Error::AuthenticationFailed("invalid username or password".to_string()));
        }

        let cookies = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok());
        session_cookie(cookies, &self.options.session_cookie).ok_or_else(|| {
            Error::AuthenticationFailed("login response carried no session cookie".to_string())
        })
    }
}

/// Whether a redirect target sends the user back to the login form
fn is_login_page(location: &str, login_url: &str) -> bool {
    if location.is_empty() {
        return false;
    }
    let trim = |s: &str| s.trim_end_matches('/').to_string();
    let target = trim(location);
    target == trim(login_url) || target.ends_with("/login")
}

/// Find the value of a named cookie among `Set-Cookie` header values
fn session_cookie<'a>(headers: impl Iterator<Item = &'a str>, name: &str) -> Option<String> {
    headers
        .filter_map(|header| header.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        // An empty value clears the cookie, a later header may still set it
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Prompts on the terminal
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn prompt(&self) -> Result<Option<LoginCredentials>> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut stderr = std::io::stderr();

        eprintln!("Session expired, please log in again");
        ask_credentials(&mut input, &mut stderr, |label| rpassword::prompt_password(label))
    }
}

/// Read the username from `input` and the password through `read_secret`
///
/// An empty username means the user declined.
fn ask_credentials<F>(
    input: &mut impl BufRead,
    out: &mut impl Write,
    read_secret: F,
) -> Result<Option<LoginCredentials>>
where
    F: FnOnce(&str) -> std::io::Result<String>,
{
    let username = read_field(input, out, "Username: ")?;
    if username.is_empty() {
        return Ok(None);
    }
    let password = read_secret("Password: ").map_err(anyhow::Error::from)?;
    Ok(Some(LoginCredentials::new(username, password)))
}

fn read_field(input: &mut impl BufRead, out: &mut impl Write, label: &str) -> Result<String> {
    write!(out, "{}", label).map_err(anyhow::Error::from)?;
    out.flush().map_err(anyhow::Error::from)?;
    let mut line = String::new();
    input.read_line(&mut line).map_err(anyhow::Error::from)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
