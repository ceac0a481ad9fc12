//! CLI mode: fetch the given links, download every track, print a summary.

mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use console::style;

use crate::{
    AppConfig, AuthState, Credentials, Error, Locked, RemoteClient, RunStart, RunSummary,
    Service, ServiceEvent, ServiceHandle, TrackDownloader,
};
use crate::link::{CatalogLink, extract_links};

use progress::{make_item_bar, print_failure, print_fetched, print_summary};

/// Environment overrides for the configured credentials.
const USERNAME_VAR: &str = "TRACKLIST_USERNAME";
const PASSWORD_VAR: &str = "TRACKLIST_PASSWORD";

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub overwrite: bool,
    pub links: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliCommand {
    Help,
    Run(CliArgs),
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns a message for unknown options or options missing their value.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliCommand, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let value = args.next().ok_or("--config requires a path")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "-d" | "--dir" => {
                let value = args.next().ok_or("--dir requires a directory")?;
                parsed.dir = Some(PathBuf::from(value));
            }
            "-f" | "--overwrite" => parsed.overwrite = true,
            "-h" | "--help" => return Ok(CliCommand::Help),
            other if !other.starts_with('-') => parsed.links.push(other.to_string()),
            other => return Err(format!("Unknown option: {other}")),
        }
    }

    if parsed.links.is_empty() {
        return Ok(CliCommand::Help);
    }
    Ok(CliCommand::Run(parsed))
}

pub fn print_usage() {
    eprintln!("Usage: tracklist [OPTIONS] <link>...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <link>              Track, album or playlist link (URI or web URL)");
    eprintln!("                      or a .txt file containing links");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  -c, --config <PATH> Config file (default: {})",
        AppConfig::default_path().display()
    );
    eprintln!("  -d, --dir <DIR>     Download directory (overrides config)");
    eprintln!("  -f, --overwrite     Re-download tracks that already exist");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {USERNAME_VAR}, {PASSWORD_VAR} override the configured login");
    eprintln!("  RUST_LOG            Log filter (default: info)");
}

/// Replaces `.txt` arguments with the links found inside them.
fn expand_link_files(args: Vec<String>) -> crate::Result<Vec<String>> {
    let mut links = Vec::new();
    for arg in args {
        let path = Path::new(&arg);
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
            && path.is_file()
        {
            let found = extract_links(&std::fs::read_to_string(path)?);
            log::info!("Found {} link(s) in {arg}", found.len());
            links.extend(found.iter().map(CatalogLink::uri));
        } else {
            links.push(arg);
        }
    }
    Ok(links)
}

/// Applies environment overrides on top of the configured credentials.
fn credentials(config: &AppConfig) -> Option<Credentials> {
    let mut section = config.credentials.clone();
    if let Ok(username) = std::env::var(USERNAME_VAR) {
        section.username = username;
    }
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        section.password = password;
    }
    section.is_configured().then(|| section.to_credentials())
}

fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// Entry point for the `tracklist` binary.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the login fails
/// or the download service stops unexpectedly.
pub async fn run() -> crate::Result<ExitCode> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(CliCommand::Run(args)) => args,
        Ok(CliCommand::Help) => {
            print_usage();
            return Ok(ExitCode::SUCCESS);
        }
        Err(message) => {
            eprintln!("Error: {message}");
            print_usage();
            return Ok(ExitCode::from(2));
        }
    };

    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_create(&config_path)?;
    if let Some(dir) = args.dir {
        config.download = config.download.with_dir(dir);
    }
    if args.overwrite {
        config.download = config.download.with_overwrite(true);
    }

    let links = expand_link_files(args.links)?;
    let summary = run_download(&config, &links).await?;
    Ok(match summary {
        Some(summary) if summary.failed > 0 => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// Logs in, queues every link and downloads all of it.
///
/// Returns `None` if nothing was downloaded: nothing was queued or the run
/// was interrupted.
///
/// # Errors
///
/// Returns an error if no credentials are configured, the login is rejected
/// or the service stops.
pub async fn run_download(
    config: &AppConfig,
    links: &[String],
) -> crate::Result<Option<RunSummary>> {
    let messages = &config.messages;
    let Some(creds) = credentials(config) else {
        return Err(Error::Login(format!(
            "no credentials configured; edit the config file or set {USERNAME_VAR}/{PASSWORD_VAR}"
        )));
    };

    let client = Arc::new(RemoteClient::new(
        build_http_client()?,
        &config.remote.base_url,
        config.download.clone(),
    ));
    let downloader: Arc<dyn TrackDownloader> = Arc::clone(&client) as Arc<dyn TrackDownloader>;
    let (handle, mut events) = Service::spawn(downloader);

    println!("Logging in...");
    if handle.authenticate(client.as_ref(), &creds).await? == AuthState::Rejected {
        eprintln!("{}", style(&messages.login_failed).red());
        return Err(Locked::SessionRejected.into());
    }
    println!("Logged in successfully.");

    println!("Fetching {} link(s)...\n", links.len());
    for link in links {
        match handle.add_link(client.as_ref(), link).await {
            Ok(count) => print_fetched(link, count),
            Err(Error::InvalidLink(_)) => {
                println!("  {link} ... {}", style(&messages.invalid_link).yellow());
            }
            Err(e) => println!("  {link} ... {}", style(format!("ERROR: {e}")).red()),
        }
    }

    handle.select_all().await?;
    match handle.start_run().await? {
        RunStart::Started => {}
        RunStart::NothingToDo => {
            println!("{}", messages.nothing_selected);
            return Ok(None);
        }
        RunStart::AlreadyRunning => return Ok(None),
        RunStart::Rejected(reason) => return Err(reason.into()),
    }

    render_run(&handle, &mut events, messages).await
}

/// Draws service events until the run finishes or is interrupted.
async fn render_run(
    handle: &ServiceHandle,
    events: &mut tokio::sync::mpsc::UnboundedReceiver<ServiceEvent>,
    messages: &crate::Messages,
) -> crate::Result<Option<RunSummary>> {
    let bar = make_item_bar();
    bar.enable_steady_tick(Duration::from_millis(250));
    let mut interrupted = false;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                log::info!("Received SIGINT");
                interrupted = true;
                handle.cancel().await?;
                continue;
            }
        };
        let Some(event) = event else {
            bar.finish_and_clear();
            return Err(Error::ServiceStopped);
        };

        match event {
            ServiceEvent::Counter(text) => bar.set_prefix(text),
            ServiceEvent::Status(text) => {
                bar.set_message(text);
                bar.set_position(0);
            }
            ServiceEvent::Percent(pct) => bar.set_position(u64::from(pct)),
            ServiceEvent::ItemFailed { label, error } => print_failure(&bar, &label, &error),
            ServiceEvent::RunCompleted(summary) => {
                bar.finish_and_clear();
                print_summary(&summary, messages);
                return Ok(Some(summary));
            }
            ServiceEvent::Cancelled => {
                bar.abandon_with_message("Cancelled");
                return Ok(None);
            }
            ServiceEvent::NothingToDo | ServiceEvent::SessionResolved(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_options_and_links() {
        let parsed = parse_args(args(&[
            "--config",
            "/tmp/c.toml",
            "-d",
            "out",
            "-f",
            "spotify:track:a",
            "https://open.spotify.com/album/b",
        ]))
        .unwrap();

        assert_eq!(
            parsed,
            CliCommand::Run(CliArgs {
                config: Some(PathBuf::from("/tmp/c.toml")),
                dir: Some(PathBuf::from("out")),
                overwrite: true,
                links: args(&["spotify:track:a", "https://open.spotify.com/album/b"]),
            })
        );
    }

    #[test]
    fn no_links_or_help_shows_usage() {
        assert_eq!(parse_args(args(&[])).unwrap(), CliCommand::Help);
        assert_eq!(
            parse_args(args(&["spotify:track:a", "-h"])).unwrap(),
            CliCommand::Help
        );
    }

    #[test]
    fn rejects_bad_options() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert_eq!(
            parse_args(args(&["--dir"])).unwrap_err(),
            "--dir requires a directory"
        );
    }

    #[test]
    fn link_files_are_expanded() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("links.txt");
        std::fs::write(
            &list,
            "mix: https://open.spotify.com/playlist/p1?si=x\nspotify:track:t1, spotify:track:t1\n",
        )
        .unwrap();
        let list = list.to_string_lossy().to_string();

        let links = expand_link_files(args(&["spotify:album:a", &list])).unwrap();
        assert_eq!(
            links,
            args(&["spotify:album:a", "spotify:playlist:p1", "spotify:track:t1"])
        );
    }

    #[tokio::test]
    async fn unconfigured_credentials_fail_before_network() {
        if std::env::var(USERNAME_VAR).is_ok() || std::env::var(PASSWORD_VAR).is_ok() {
            return;
        }
        let config = AppConfig::default();
        let result = run_download(&config, &args(&["spotify:track:a"])).await;
        assert!(matches!(result, Err(Error::Login(_))));
    }
}
