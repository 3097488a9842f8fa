//! Readable messages for libgit2 failures

use git2::{Error, ErrorClass};

#[derive(Clone, Copy)]
enum Kind {
    NotFound,
    Auth,
    Permission,
    Network,
    Certificate,
    Ssl,
}

type Check = fn(&str, ErrorClass) -> bool;

// Order matters: the first matching check wins.
const CLASSIFICATIONS: &[(Check, Kind)] = &[
    (
        |msg, _| {
            msg.contains("not found")
                || msg.contains("404")
                || msg.contains("too many redirects")
                || msg.contains("authentication replays")
        },
        Kind::NotFound,
    ),
    (
        |msg, _| msg.contains("authentication") || msg.contains("credentials"),
        Kind::Auth,
    ),
    (
        |msg, _| msg.contains("permission denied") || msg.contains("access denied"),
        Kind::Permission,
    ),
    (
        |msg, _| {
            msg.contains("connection")
                || msg.contains("network")
                || msg.contains("timeout")
                || msg.contains("timed out")
        },
        Kind::Network,
    ),
    (
        |msg, class| class == ErrorClass::Http && msg.contains("certificate"),
        Kind::Certificate,
    ),
    (
        |msg, class| class == ErrorClass::Http && msg.contains("ssl"),
        Kind::Ssl,
    ),
];

/// Turn a git2 error into a short message for the user
pub fn interpret_git_error(err: &Error) -> String {
    let message = err.message().to_lowercase();
    let kind = CLASSIFICATIONS
        .iter()
        .find(|(check, _)| check(&message, err.class()))
        .map(|(_, kind)| *kind);

    match kind {
        Some(Kind::NotFound) => "Registry repository not found".to_string(),
        Some(Kind::Auth) => "Authentication failed".to_string(),
        Some(Kind::Permission) => "Permission denied".to_string(),
        Some(Kind::Network) => "Network error".to_string(),
        Some(Kind::Certificate) => "Certificate error".to_string(),
        Some(Kind::Ssl) => "SSL error".to_string(),
        None => match err.class() {
            ErrorClass::Http => format!("HTTP error: {}", err.message()),
            ErrorClass::Ssh => format!("SSH error: {}", err.message()),
            _ => err.message().to_string(),
        },
    }
}
