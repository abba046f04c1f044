use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use quire::{
    application::error::AppError,
    cache::{CacheInvalidator, CacheState, CdnPurger, ResponseStore},
    config::{self, Settings},
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, AppState},
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let rendered = match error {
        AppError::Infra(infra) => infra.chain(),
        other => other.to_string(),
    };
    if dispatcher::has_been_set() {
        error!(error = %rendered, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %rendered, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Some(config::Command::Migrate(_)) => run_migrations(&settings).await,
        Some(config::Command::Serve(_)) | None => run_serve(settings).await,
    }
}

async fn connect(settings: &Settings) -> Result<sqlx::SqlitePool, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| InfraError::connect(&settings.database.url, err))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    Ok(pool)
}

async fn run_migrations(settings: &Settings) -> Result<(), AppError> {
    let pool = connect(settings).await?;
    pool.close().await;
    info!(
        target = "quire::migrate",
        database = %settings.database.url,
        "migrations applied"
    );
    Ok(())
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let repositories = Arc::new(SqliteRepositories::new(connect(&settings).await?));

    let store = settings.cache.enabled.then(|| {
        Arc::new(ResponseStore::new(
            settings.cache.max_entries,
            settings.cache.public_max_age,
        ))
    });
    let purger = settings
        .purge
        .as_ref()
        .map(CdnPurger::new)
        .transpose()
        .map_err(InfraError::Purge)?;
    if purger.is_none() {
        warn!(
            target = "quire::cache::purge",
            "CDN purge disabled; published changes may be stale at the edge"
        );
    }

    let invalidator = CacheInvalidator::new(store.clone(), purger);
    let state = AppState::new(repositories, invalidator, &settings);
    if !state.auth.is_configured() {
        warn!(
            target = "quire::http::auth",
            "auth.admin_token is not set; every admin request will be rejected"
        );
    }

    let router = http::build_router(state, store.map(|store| CacheState { store }));
    serve_http(&settings, router).await
}

async fn serve_http(settings: &Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| InfraError::bind(settings.server.addr, err))?;
    info!(
        target = "quire::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        if stop_rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server.into_future() => {
            result.map_err(InfraError::Serve)?;
            info!(target = "quire::serve", "server stopped");
        }
        () = deadline => {
            warn!(
                target = "quire::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "quire::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "quire::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!(target = "quire::serve", "shutdown signal received");
}
