use std::time::Duration;

use clap::Parser;
use log::info;

use webhook_probe::capture::CaptureServer;
use webhook_probe::cli::{parse_header, CliArguments, Command};
use webhook_probe::error::Error;
use webhook_probe::mock::{MockConfig, MockServer};
use webhook_probe::records;
use webhook_probe::sender::{self, SendSpec};

#[actix_web::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = CliArguments::parse();

    if let Err(err) = run(args.command).await {
        log::error!("{err}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Listen { port, save } => {
            let server = CaptureServer::start(port)?;
            info!("Listening on http://{}", server.addr());
            info!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            info!("Stopping server...");
            let log = server.stop().await;
            if let Some(path) = save {
                if log.is_empty() {
                    info!("No requests captured, nothing to save");
                } else {
                    records::export(&log, &path)?;
                    info!("Saved {} requests to {}", log.len(), path.display());
                }
            }
            Ok(())
        }
        Command::Send {
            url,
            method,
            data,
            headers,
            repeat,
            delay,
        } => {
            let body = data.as_deref().map(serde_json::from_str).transpose()?;
            let headers = headers
                .iter()
                .map(|raw| parse_header(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let spec = SendSpec {
                url,
                method,
                headers,
                body,
                repeat,
                delay: Duration::from_secs_f64(delay.max(0.0)),
            };
            info!("{} {}", spec.method.to_uppercase(), spec.url);
            let client = sender::client()?;
            let attempts = sender::send(&client, &spec).await?;
            if attempts.len() > 1 {
                info!("Sent {} requests", attempts.len());
            }
            Ok(())
        }
        Command::Mock {
            port,
            response,
            status,
            delay,
        } => {
            let config = MockConfig {
                port,
                status,
                body: response,
                content_type: "application/json".to_string(),
                delay: Duration::from_secs_f64(delay.max(0.0)),
            };
            let server = MockServer::start(config)?;
            info!("Mock server on http://{}", server.addr());
            info!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            server.stop().await;
            info!("Server stopped");
            Ok(())
        }
        Command::Inspect { path } => {
            let log = records::load(&path)?;
            println!("Saved requests ({})", log.len());
            print!("{}", records::inspect(&log));
            Ok(())
        }
    }
}
