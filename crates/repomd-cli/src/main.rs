use clap::Parser;
use cli::{Args, Commands};
use error::{AppError, AppResult};
use list::{list_databases, list_packages, ListOptions};
use logging::setup_logging;
use repomd_config::config::{self, config_path, generate_default_config, get_config, Config};
use repomd_dl::http_client::configure_http_client;
use tracing::{debug, info};
use ureq::{
    http::{HeaderMap, HeaderName, HeaderValue},
    Proxy,
};
use utils::set_color;

mod cli;
mod error;
mod list;
mod logging;
mod utils;

fn parse_headers(headers: &[String]) -> AppResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let invalid = || AppError::InvalidHeader(header.clone());
        let (key, value) = header.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::from_bytes(key.trim().as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
        map.append(name, value);
    }
    Ok(map)
}

/// Applies command line and configuration settings to the shared HTTP client.
fn setup_http_client(args: &Args, config: &Config) -> AppResult<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy).map_err(|err| {
                AppError::InvalidProxy {
                    proxy: proxy.to_string(),
                    reason: err.to_string(),
                }
            })
        })
        .transpose()?;
    let headers = args.header.as_deref().map(parse_headers).transpose()?;
    let user_agent = args.user_agent.clone().or_else(|| config.user_agent.clone());
    let timeout = config.timeout()?;

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if headers.is_some() {
            client.headers = headers;
        }
        if user_agent.is_some() {
            client.user_agent = user_agent;
        }
        client.timeout = timeout;
    });

    Ok(())
}

fn load_config(args: &Args) -> AppResult<Config> {
    config::init()?;
    let config = get_config();
    setup_http_client(args, &config)?;
    Ok(config)
}

async fn handle_cli() -> AppResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        set_color(false);
    }

    if let Some(ref path) = args.config {
        config::set_config_path(path)?;
    }
    debug!(path = %config_path().display(), "using configuration file");

    match &args.command {
        Commands::DefConfig => {
            generate_default_config(None)?;
        }
        Commands::Config => {
            let config = load_config(&args)?;
            info!("{}", config.to_toml()?);
        }
        Commands::Dbs {
            selection,
        } => {
            let config = load_config(&args)?;
            list_databases(&config, selection, args.json)?;
        }
        Commands::Packages {
            selection,
            types,
            skip_invalid,
            limit,
        } => {
            let config = load_config(&args)?;
            let options = ListOptions {
                types: types.clone(),
                skip_invalid: *skip_invalid,
                limit: *limit,
                json: args.json,
            };
            list_packages(&config, selection, options).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
