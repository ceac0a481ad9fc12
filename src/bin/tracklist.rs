//! tracklist - download tracks, albums and playlists from the command line.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match tracklist_dl::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
