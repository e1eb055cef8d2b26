//! Command line parsing for the agent binary.

use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub config: PathBuf,
    /// Overrides `api.port` when present.
    pub port: Option<u16>,
}

/// `Err` carries the usage text, for `--help` and unexpected arguments.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sysmon_agent".into());
    let usage = format!("Usage: {prog} [--config PATH|-c PATH] [--port PORT|-p PORT]");
    let mut config: Option<String> = None;
    let mut port: Option<String> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage),
            "--config" | "-c" => match it.next() {
                Some(v) => config = Some(v),
                None => return Err(format!("{arg} needs a value. {usage}")),
            },
            "--port" | "-p" => match it.next() {
                Some(v) => port = Some(v),
                None => return Err(format!("{arg} needs a value. {usage}")),
            },
            _ if arg.starts_with("--config=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        config = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--port=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    port = Some(v.to_string());
                }
            }
            _ => return Err(format!("Unexpected argument '{arg}'. {usage}")),
        }
    }
    Ok(ParsedArgs {
        config: PathBuf::from(config.unwrap_or_else(|| DEFAULT_CONFIG.into())),
        port: port.and_then(|s| s.parse::<u16>().ok()),
    })
}
