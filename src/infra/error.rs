//! Failures raised while wiring up the service: storage, listener and logging.

use std::io;
use std::net::SocketAddr;

use sqlx::migrate::MigrateError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::cache::PurgeError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to open database `{url}`")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to apply database migrations")]
    Migrate(#[from] MigrateError),
    #[error("failed to bind HTTP listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("HTTP server stopped unexpectedly")]
    Serve(#[source] io::Error),
    #[error("invalid CDN purge settings")]
    Purge(#[source] PurgeError),
    #[error("failed to install tracing subscriber")]
    Telemetry(#[from] TryInitError),
}

impl InfraError {
    pub fn connect(url: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Connect {
            url: url.into(),
            source,
        }
    }

    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }

    /// Display of this error followed by every source, joined with `: `.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(inner) = current {
            rendered.push_str(": ");
            rendered.push_str(&inner.to_string());
            current = inner.source();
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn bind_failure_keeps_the_io_error_as_source() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().expect("addr");
        let error = InfraError::bind(addr, io::Error::from(io::ErrorKind::AddrInUse));

        let source = error.source().expect("source");
        let io_error = source.downcast_ref::<io::Error>().expect("io error");
        assert_eq!(io_error.kind(), io::ErrorKind::AddrInUse);
        assert!(error.chain().starts_with("failed to bind HTTP listener on 127.0.0.1:8080: "));
    }

    #[test]
    fn connect_failure_names_the_url_and_keeps_the_sqlx_error() {
        let error = InfraError::connect("sqlite://missing.db", sqlx::Error::PoolTimedOut);

        assert_eq!(error.to_string(), "failed to open database `sqlite://missing.db`");
        let source = error.source().expect("source");
        assert!(matches!(
            source.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::PoolTimedOut)
        ));
        assert_ne!(error.chain(), error.to_string());
    }
}
