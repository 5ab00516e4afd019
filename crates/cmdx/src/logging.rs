#![forbid(unsafe_code)]

//! JSON log output for hosts that do not install their own subscriber.

use tracing_subscriber::EnvFilter;

use crate::Error;

/// Install a global JSON subscriber.
///
/// `filter` uses `EnvFilter` directive syntax (`"cmdx_runtime=debug,info"`).
/// `RUST_LOG` wins when set. Fails if a global subscriber already exists.
pub fn init(filter: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|err| Error::Logging(err.to_string()))?;
    tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_reported() {
        // RUST_LOG would shadow the directive under test.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(init("cmdx=verbose"), Err(Error::Logging(_))));
    }
}
