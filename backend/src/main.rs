use std::process::ExitCode;

use clap::Parser;
use studio::{cli::Cli, state::AppContext, types::Environment};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let environment = Environment::from_env();

    // JSON logs for staging/production, plain output for development
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(environment.tracing_level().as_str()));
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let context = AppContext::from_environment(environment);

    // Ends once the auth client is dropped, after the last change is seen
    let mut subscription = context.auth.subscribe();
    let session_logger = tokio::spawn(async move {
        let mut signed_in = subscription.current().is_some();
        while let Some(session) = subscription.changed().await {
            match session {
                Some(session) => tracing::info!("signed in as {}", session.user_id()),
                None if signed_in => tracing::info!("signed out"),
                None => {}
            }
            signed_in = subscription.current().is_some();
        }
    });

    let outcome = cli.run(&context).await;
    context.auth.sign_out().await;
    drop(context);
    if let Err(e) = session_logger.await {
        tracing::warn!("session logger stopped early: {e}");
    }

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            match err.notice() {
                Some(notice) => eprintln!("{notice}"),
                None => eprintln!("error: {err}"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
