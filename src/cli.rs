use std::path::PathBuf;

use crate::error::Error;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArguments {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Start a listener that captures every inbound request
    Listen {
        #[arg(long, default_value_t = 8080, help = "Port to listen on")]
        port: u16,
        #[arg(long, help = "Save captured requests to this file on exit")]
        save: Option<PathBuf>,
    },
    /// Send test webhook requests
    Send {
        url: String,
        #[arg(long, default_value = "POST", help = "HTTP method")]
        method: String,
        #[arg(short, long, help = "JSON data")]
        data: Option<String>,
        #[arg(short = 'H', long = "header", help = "Extra header as \"Key: Value\"")]
        headers: Vec<String>,
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Number of times to send"
        )]
        repeat: u32,
        #[arg(long, default_value_t = 0.0, help = "Delay between requests in seconds")]
        delay: f64,
    },
    /// Start a mock server with a fixed response
    Mock {
        #[arg(long, default_value_t = 8080, help = "Port to listen on")]
        port: u16,
        #[arg(long, default_value = r#"{"status": "ok"}"#, help = "JSON response")]
        response: String,
        #[arg(long, default_value_t = 200, help = "HTTP status code")]
        status: u16,
        #[arg(long, default_value_t = 0.0, help = "Response delay in seconds")]
        delay: f64,
    },
    /// Inspect saved webhook requests
    Inspect { path: PathBuf },
}

/// Splits a `-H "Key: Value"` flag on the first colon.
pub fn parse_header(raw: &str) -> Result<(String, String), Error> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(raw.to_string()))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}
