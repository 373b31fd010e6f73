use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use firetest_server::{FiretestServer, SecretAuth, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args, format),
        Command::Token(args) => cmd_token(args, format),
        Command::Config(args) => cmd_config(args, format),
    }
}

/// File settings first, flags on top.
pub fn resolve_config(options: &ServerOptions) -> anyhow::Result<ServerConfig> {
    let mut config = match &options.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = options.bind {
        config.bind_addr = bind;
    }
    if options.require_auth {
        config.require_auth = true;
    }
    if let Some(secret) = &options.secret {
        config.secret = Some(secret.clone());
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.server)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let server = FiretestServer::new(config);
        let mut running = server.start().await?;
        match format {
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "url": running.url(),
                    "secret": running.secret(),
                    "require_auth": server.config().require_auth,
                })
            ),
            OutputFormat::Text => {
                println!("{} Firetest listening on {}", "✓".green().bold(), running.url().bold());
                println!("  Secret: {}", running.secret().yellow());
                if server.config().require_auth {
                    println!("  Auth: {}", "required".cyan());
                }
                println!("  Press Ctrl-C to stop.");
            }
        }
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        running.close().await?;
        println!("{} Stopped.", "✓".green());
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_token(args: TokenArgs, format: OutputFormat) -> anyhow::Result<()> {
    let auth = SecretAuth::new(args.secret);
    let token = auth.issue_token(&args.uid, args.ttl.map(Duration::from_secs))?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "uid": args.uid, "token": token })),
        OutputFormat::Text => println!("{token}"),
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.server)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let options = ServerOptions {
            bind: Some("127.0.0.1:7000".parse().unwrap()),
            require_auth: true,
            secret: Some("x".into()),
            ..ServerOptions::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.bind_addr.port(), 7000);
        assert!(config.require_auth);
        assert_eq!(config.secret.as_deref(), Some("x"));
        assert_eq!(config.delivery_timeout_ms, 250);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let options = ServerOptions {
            config: Some("/no/such/firetest.toml".into()),
            ..ServerOptions::default()
        };
        let err = resolve_config(&options).unwrap_err();
        assert!(err.to_string().contains("loading config"));
    }
}
