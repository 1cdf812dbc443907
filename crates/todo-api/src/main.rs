//! todo-api バイナリのエントリポイント
//! 環境変数の設定に従って HTTP サーバを起動します。

use anyhow::Context;
use infrastructure::FileTodoRepository;
use shared::Config;
use std::sync::Arc;
use todo_api::{app_with_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    shared::init_tracing(config.log_format).map_err(|e| anyhow::anyhow!(e))?;

    // TODO_DATA_FILE があればファイル永続化、なければメモリのみ
    let state = match &config.data_file {
        Some(path) => {
            let repo = FileTodoRepository::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            AppState::new(Arc::new(repo))
        }
        None => {
            tracing::warn!("TODO_DATA_FILE is not set; todos are kept in memory only");
            AppState::in_memory()
        }
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server starting");

    axum::serve(listener, app_with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
