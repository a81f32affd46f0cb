//! Errors returned by cluster calls

use thiserror::Error;

/// Failure of a single remote call against the cluster API
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The API server answered with a non-success status
    #[error("{message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    /// The request never got a status back (connection, TLS, decoding)
    #[error("cluster request failed: {0}")]
    Transport(#[source] kube::Error),
}

impl ClusterError {
    pub fn api(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        ClusterError::Api {
            code,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// HTTP status code reported by the API server, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClusterError::Api { code, .. } => Some(*code),
            ClusterError::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => ClusterError::Api {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            },
            other => ClusterError::Transport(other),
        }
    }
}
