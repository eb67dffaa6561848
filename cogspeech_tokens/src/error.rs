use thiserror::Error;

/// An error reported to a caller waiting on a token
#[derive(Debug, Error)]
pub enum TokenError<E> {
    /// The issuing endpoint answered with a status other than `200`
    #[error("auth returned HTTP {status}")]
    Http {
        /// The transport status code
        status: u16,
    },
    /// The issuing endpoint answered `200` with an empty body
    #[error("response is missing access token")]
    MissingToken,
    /// The issuing endpoint could not be reached
    #[error(transparent)]
    Transport(E),
    /// The caller joined a fetch that failed, and failures are reported only to the
    /// caller that triggered the fetch
    #[error("joined token fetch failed without reporting an outcome")]
    Abandoned,
}

impl<E> TokenError<E> {
    /// The status code returned by the issuing endpoint, if that was the cause
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_describe_the_failure() {
        let http: TokenError<std::io::Error> = TokenError::Http { status: 401 };
        assert_eq!(http.to_string(), "auth returned HTTP 401");
        assert_eq!(http.status(), Some(401));

        let missing: TokenError<std::io::Error> = TokenError::MissingToken;
        assert_eq!(missing.to_string(), "response is missing access token");
        assert_eq!(missing.status(), None);
    }

    #[test]
    fn transport_errors_pass_through() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = TokenError::Transport(io);
        assert_eq!(error.to_string(), "refused");
    }
}
