use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, normalize_server_url},
    DonationFeedController, FeedScreen, Field, HttpGateway, LoginScreen,
    SessionController, SubmitOutcome,
};
use shared::domain::LoginResult;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Overrides the server url from settings.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the donation list as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = &args.server_url {
        settings.server_url = normalize_server_url(server_url)?;
    }
    info!(server_url = %settings.server_url, "starting donation client");

    let gateway = Arc::new(
        HttpGateway::from_settings(&settings).context("failed to build http client")?,
    );
    let options = settings.controller_options();

    let session = sign_in(
        SessionController::with_options(gateway.clone(), options),
        &args.email,
        &args.password,
    )
    .await?;
    println!(
        "Signed in as {} <{}>",
        session.user.display_name, session.user.email
    );

    let feed = DonationFeedController::with_options(gateway, &session, options);
    let mut stream = feed.subscribe();
    let mut screen = FeedScreen::default();
    feed.refresh()?;
    while let Some(event) = stream.next_event().await {
        debug!(phase = event.phase(), "donation feed event");
        screen.apply_event(&event);
        if event.is_terminal() {
            break;
        }
    }
    feed.dispose();

    if let Some(message) = screen.error_message() {
        bail!("{message}");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(screen.donations())?);
    } else if screen.donations().is_empty() {
        println!("No donations yet.");
    } else {
        for donation in screen.donations() {
            println!(
                "#{:<6} {:<10} {}",
                donation.id.0,
                donation.status.as_str(),
                donation.title
            );
        }
    }

    Ok(())
}

async fn sign_in(
    controller: SessionController,
    email: &str,
    password: &str,
) -> Result<LoginResult> {
    let mut screen = LoginScreen::default();
    let mut stream = controller.subscribe();

    let outcome = controller.submit(email, password)?;
    screen.apply_submit(&outcome);
    if let SubmitOutcome::Invalid(_) = outcome {
        for field in [Field::Email, Field::Password] {
            if let Some(message) = screen.field_message(field) {
                eprintln!("{}: {message}", field.as_str());
            }
        }
        bail!("sign-in form is invalid");
    }

    while let Some(event) = stream.next_event().await {
        debug!(phase = event.phase(), "login event");
        screen.apply_event(&event);
        if event.is_loading() {
            eprintln!("Signing in...");
        }
        if let Some(session) = screen.take_navigation() {
            controller.dispose();
            return Ok(session);
        }
        if let Some(message) = screen.error_message() {
            bail!("{message}");
        }
    }

    bail!("login stream closed before the attempt finished")
}
