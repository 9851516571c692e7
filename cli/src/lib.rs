//! `coursefetch` command-line front end.

mod args;
mod render;
mod reporter;

use std::io::IsTerminal;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coursefetch_client::AppConfig;
use coursefetch_client::ConfigLoader;
use coursefetch_client::CourseQuery;
use coursefetch_client::PortalClient;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

pub use args::Cli;
pub use args::Command;
pub use args::CourseFormat;
pub use args::Credentials;
pub use args::OptionsFormat;
pub use reporter::TerminalReporter;

/// Environment variable holding the portal password.
pub const PASSWORD_ENV: &str = "COURSEFETCH_PASSWORD";

/// How long a best-effort logout may take before it is abandoned.
const LOGOUT_GRACE: Duration = Duration::from_secs(5);

/// Exit code for a run the user cancelled with Ctrl-C.
pub const EXIT_CANCELLED: u8 = 130;

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = ConfigLoader::load_default(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.portal.base_url = base_url.clone();
        config.validate()?;
    }
    Ok(config)
}

async fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await
        .context("failed to read password from stdin")?;
    line.with_context(|| format!("no password: set {PASSWORD_ENV} or pipe it on stdin"))
}

/// Run one command. Cancelling `shutdown` cancels whatever request is in
/// flight; the resulting error satisfies [`is_cancelled`].
pub async fn run(cli: Cli, shutdown: CancellationToken) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    tracing::debug!(base_url = %config.portal.base_url, "configuration loaded");

    let stderr = std::io::stderr();
    let reporter = TerminalReporter::stderr(
        supports_color::on(supports_color::Stream::Stderr).is_some(),
        stderr.is_terminal(),
    );
    let client = PortalClient::from_config(&config)?
        .map_engine(|engine| engine.with_reporter(Arc::new(reporter)).with_shutdown(shutdown));

    let stdout_ansi = supports_color::on(supports_color::Stream::Stdout).is_some();
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Login(credentials) => {
            let response = login(&client, &credentials).await?;
            let printed = writeln!(
                stdout,
                "{}",
                response.message.as_deref().unwrap_or("Login successful")
            );
            logout(&client).await;
            printed?;
        }
        Command::Options(args) => {
            login(&client, &args.credentials).await?;
            let listed = async {
                let options = client.fetch_options().await?;
                match args.format {
                    OptionsFormat::Table => render::write_options_table(&mut stdout, &options)?,
                    OptionsFormat::Json => render::write_options_json(&mut stdout, &options)?,
                }
                anyhow::Ok(())
            }
            .await;
            logout(&client).await;
            listed?;
        }
        Command::Courses(args) => {
            login(&client, &args.credentials).await?;
            let listed = async {
                let courses = client
                    .fetch_courses(&args.department, &args.semester)
                    .await?;
                let query = CourseQuery {
                    available_only: args.available,
                    tags: args.tags,
                    sort: args.sort,
                };
                let selected = query.apply(&courses);
                render::write_courses(
                    &mut stdout,
                    &selected,
                    courses.len(),
                    args.format,
                    stdout_ansi,
                )
            }
            .await;
            logout(&client).await;
            listed?;
        }
    }
    stdout.flush()?;
    Ok(())
}

async fn login(
    client: &PortalClient,
    credentials: &Credentials,
) -> anyhow::Result<coursefetch_client::LoginResponse> {
    let password = read_password().await?;
    Ok(client.login(&credentials.user, &password).await?)
}

/// Release the proxy session after a successful login, whether or not the
/// command itself succeeded. Failures only get logged.
async fn logout(client: &PortalClient) {
    match tokio::time::timeout(LOGOUT_GRACE, client.logout()).await {
        Ok(Ok(())) => tracing::debug!("logged out"),
        Ok(Err(err)) => tracing::warn!(error = %err, "logout failed"),
        Err(_) => tracing::warn!("logout did not finish in time, abandoning"),
    }
}

/// Whether `err` came from a user cancellation.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<coursefetch_client::ClientError>()
        .is_some_and(coursefetch_client::ClientError::is_cancelled)
}
