//! Access token for Azure DevOps, obtained from the Azure CLI.

use std::future::Future;
use std::time::Duration;
use tokio::process::Command;

/// Well-known resource id of Azure DevOps.
pub const AZURE_DEVOPS_RESOURCE: &str = "499b84ac-1321-427f-aa17-267ca6975798";
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("timed out after {}s waiting for an access token", .0.as_secs())]
    Timeout(Duration),
    #[error("could not run the Azure CLI (`az`): {0}. Install it and run `az login`")]
    ToolMissing(#[source] std::io::Error),
    #[error("`az account get-access-token` failed: {0}. Try `az login`")]
    ToolFailed(String),
    #[error("unexpected token output: {0}")]
    Parse(String),
}

/// Fetch a bearer token via `az account get-access-token`.
pub async fn fetch_token() -> Result<String, AuthError> {
    with_timeout(az_cli_token(), TOKEN_TIMEOUT).await
}

/// Bound a token producer by a wall-clock limit.
pub async fn with_timeout<F>(producer: F, limit: Duration) -> Result<String, AuthError>
where
    F: Future<Output = Result<String, AuthError>>,
{
    match tokio::time::timeout(limit, producer).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::Timeout(limit)),
    }
}

async fn az_cli_token() -> Result<String, AuthError> {
    tracing::debug!("Requesting access token from Azure CLI");
    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            AZURE_DEVOPS_RESOURCE,
            "--output",
            "json",
        ])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(AuthError::ToolMissing)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AuthError::ToolFailed(stderr.trim().to_string()));
    }

    parse_token(&String::from_utf8_lossy(&output.stdout))
}

fn parse_token(stdout: &str) -> Result<String, AuthError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| AuthError::Parse(e.to_string()))?;
    value["accessToken"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AuthError::Parse("missing accessToken".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        let out = r#"{"accessToken": "abc.def", "expiresOn": "2030-01-01 00:00:00"}"#;
        assert_eq!(parse_token(out).unwrap(), "abc.def");
        assert!(matches!(parse_token("{}"), Err(AuthError::Parse(_))));
        assert!(matches!(parse_token("not json"), Err(AuthError::Parse(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let never = std::future::pending::<Result<String, AuthError>>();
        let result = with_timeout(never, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(AuthError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_fast_producer_passes_through() {
        let ready = async { Ok("token".to_string()) };
        assert_eq!(
            with_timeout(ready, Duration::from_secs(1)).await.unwrap(),
            "token"
        );
    }
}
