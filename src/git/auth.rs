//! Credential callbacks for registry clones and fetches
//!
//! Authentication is left to git's own mechanisms: the SSH agent, keys in
//! `~/.ssh/` and configured credential helpers. Public registries go through
//! with empty credentials.

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, RemoteCallbacks};

const SSH_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

fn auth_error(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

fn ssh_key_credentials(username: &str) -> Result<Cred, Error> {
    let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");

    SSH_KEY_NAMES
        .iter()
        .map(|name| (ssh_dir.join(name), ssh_dir.join(format!("{name}.pub"))))
        .filter(|(private_key, _)| private_key.exists())
        .find_map(|(private_key, public_key)| {
            let public_key = public_key.exists().then_some(public_key.as_path());
            Cred::ssh_key(username, public_key, &private_key, None).ok()
        })
        .ok_or_else(|| auth_error("no usable SSH key"))
}

fn plaintext_credentials(url: &str, username: Option<&str>) -> Result<Cred, Error> {
    let helper = git2::Config::open_default()
        .or_else(|_| git2::Config::new())
        .ok()
        .and_then(|config| Cred::credential_helper(&config, url, username).ok());
    if let Some(cred) = helper {
        return Ok(cred);
    }

    // Anonymous access lets the server answer with the real error.
    [username.unwrap_or(""), "git", "anonymous"]
        .into_iter()
        .find_map(|user| Cred::userpass_plaintext(user, "").ok())
        .ok_or_else(|| auth_error("authentication failed"))
}

/// Install the credential callback on `callbacks`
pub fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>) {
    callbacks.credentials(|url, username_from_url, allowed| {
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username).or_else(|_| ssh_key_credentials(username));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return plaintext_credentials(url, username_from_url);
        }

        Err(auth_error("no supported credential type"))
    });
}
