//! The persistent connection handle a connect worker hands off to the
//! download worker that follows it.
//!
//! HTTP(S) has nothing to carry: `reqwest::Client` already pools and reuses
//! connections internally, so every HTTP(S) worker just borrows the
//! [`Manager`](crate::manager::Manager)'s shared client. FTP's control
//! connection, on the other hand, must be the *same* logged-in session the
//! connect worker opened (and `CWD`'d into place) - `RETR` runs over it.

use suppaftp::AsyncFtpStream;

/// A connection carried from a connect worker into the matching download
/// worker.
pub enum Connection {
    /// HTTP(S): no state to carry, connections are pooled by the shared
    /// client.
    Http,
    /// FTP: the logged-in control connection, already `CWD`'d to the
    /// mirror's directory.
    Ftp(Box<AsyncFtpStream>),
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("Connection::Http"),
            Self::Ftp(_) => f.write_str("Connection::Ftp(..)"),
        }
    }
}
