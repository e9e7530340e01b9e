//! Access-token resolution for the Google APIs.
//!
//! Tokens come from, in order:
//!
//! 1. `GOOGLE_OAUTH_ACCESS_TOKEN`
//! 2. `gcloud auth print-access-token` (the operator's active gcloud account)

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable holding a ready-made OAuth access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Resolve an access token from the environment or gcloud
pub async fn resolve_access_token() -> Result<String> {
    if let Some(token) = token_from_env() {
        debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(token);
    }

    debug!("Requesting access token from gcloud");
    token_from_gcloud().await
}

fn token_from_env() -> Option<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn token_from_gcloud() -> Result<String> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            Error::Auth(format!(
                "could not run gcloud ({}); set {} or install the Cloud SDK",
                e, ACCESS_TOKEN_ENV
            ))
        })?;

    if !output.status.success() {
        return Err(Error::Auth(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Auth(
            "gcloud auth print-access-token returned an empty token".to_string(),
        ));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_env_token_wins() {
        std::env::set_var(ACCESS_TOKEN_ENV, "  ya29.test-token\n");
        let token = resolve_access_token().await.unwrap();
        std::env::remove_var(ACCESS_TOKEN_ENV);
        assert_eq!(token, "ya29.test-token");
    }

    #[test]
    #[serial]
    fn test_blank_env_token_is_ignored() {
        std::env::set_var(ACCESS_TOKEN_ENV, "   ");
        assert!(token_from_env().is_none());
        std::env::remove_var(ACCESS_TOKEN_ENV);
    }
}
