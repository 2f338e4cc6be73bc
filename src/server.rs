// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup wiring and the serve loop.

use std::sync::Arc;

use tokio::net::TcpListener;
use utoipa::OpenApi;

use crate::{
    api::{router, users::WRITE_CLAIM, ApiDoc},
    auth::{
        ContractError, IdentityProvider, JwksIdentityProvider, LocalIdentityProvider,
        OperationRegistry, ProviderError, TokenSubject, TokenVerifier,
    },
    config::{Config, IdentityConfig},
    state::AppState,
    storage::{RedbUserRepository, StoreError},
};

/// Subject of the tokens printed in local mode.
const LOCAL_DEVELOPER_SUBJECT: &str = "local-developer";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open user store: {0}")]
    Store(#[from] StoreError),

    #[error("identity provider unavailable: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid API contract: {0}")]
    Contract(#[from] ContractError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the store, connect the identity provider and load the contract.
pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let users = RedbUserRepository::open_in(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "user store opened");

    let provider: Arc<dyn IdentityProvider> = match &config.identity {
        IdentityConfig::Jwks(jwks) => {
            let provider = JwksIdentityProvider::new(jwks.clone())?;
            provider.check_ready().await?;
            tracing::info!(
                jwks_url = %jwks.jwks_url,
                issuer = %jwks.issuer,
                audience = %jwks.audience,
                "identity provider keys loaded"
            );
            Arc::new(provider)
        }
        IdentityConfig::Local { secret, token_ttl } => {
            let provider = LocalIdentityProvider::new(secret.as_bytes(), *token_ttl)?;
            log_local_tokens(&provider)?;
            Arc::new(provider)
        }
    };

    let operations = OperationRegistry::from_openapi(&ApiDoc::openapi())?;
    tracing::info!(operations = operations.len(), "API contract loaded");

    Ok(AppState::new(
        TokenVerifier::new(provider),
        Arc::new(users),
        operations,
    ))
}

/// Print a reader and a writer token for local development.
fn log_local_tokens(provider: &LocalIdentityProvider) -> Result<(), ProviderError> {
    let subject = TokenSubject::developer(LOCAL_DEVELOPER_SUBJECT);
    let reader = provider.issue_token(&subject, &[])?;
    let writer = provider.issue_token(&subject, &[WRITE_CLAIM])?;

    tracing::warn!("local identity provider in use; do not run this mode in production");
    tracing::info!(token = %reader, "local reader token");
    tracing::info!(token = %writer, permissions = WRITE_CLAIM, "local writer token");
    Ok(())
}

/// Serve until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let state = build_state(&config).await?;
    let app = router(state, config.request_timeout);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        "users API listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::auth::JwksProviderConfig;
    use crate::config::IdentityConfig;
    use tempfile::TempDir;

    fn config(dir: &TempDir, identity: IdentityConfig) -> Config {
        Config {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            data_dir: dir.path().join("data"),
            identity,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn local_mode_builds_state() {
        let dir = TempDir::new().unwrap();
        let config = config(
            &dir,
            IdentityConfig::Local {
                secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl: Duration::from_secs(60),
            },
        );

        let state = build_state(&config).await.unwrap();
        assert_eq!(state.verifier.provider().name(), "local");
        assert!(!state.operations.is_empty());
        assert!(dir.path().join("data").join("users.redb").exists());
    }

    #[tokio::test]
    async fn unreachable_jwks_endpoint_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut jwks = JwksProviderConfig::for_project("demo");
        jwks.jwks_url = "http://127.0.0.1:1/jwks".to_string();
        let config = config(&dir, IdentityConfig::Jwks(jwks));

        let result = build_state(&config).await;
        assert!(matches!(result, Err(StartupError::Provider(_))));
    }
}
