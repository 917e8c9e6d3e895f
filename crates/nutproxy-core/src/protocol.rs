// ── NUT request interpreter ──
//
// Parses one NUT request line into a `Request`, and turns a request into a
// `Response` using the configuration and the session's telemetry cache.
// Protocol refusals are ordinary `ERR <CODE>` responses; only telemetry and
// resolver faults surface as `CoreError`.

use std::fmt::Write as _;

use strum::Display;

use crate::config::ProxyConfig;
use crate::error::CoreError;
use crate::telemetry::{StatusRunner, TelemetryCache};

/// Reason codes sent as `ERR <CODE>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE")]
pub enum ErrorCode {
    UnknownUps,
    VarNotSupported,
    InvalidArgument,
    Readonly,
    FeatureNotConfigured,
    UnknownCommand,
}

/// A parsed NUT request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login { ups: String },
    Username,
    Password,
    Logout,
    StartTls,
    ListUps,
    ListVar { ups: String },
    GetVar { ups: String, var: String },
    SetVar { ups: String, var: String },
    /// Recognised command with the wrong number of arguments.
    Invalid,
    Unknown,
}

impl Request {
    /// Classify a request line. The line is expected without its trailing
    /// newline; surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if let Some(ups) = line.strip_prefix("LOGIN ") {
            return Self::Login { ups: ups.to_owned() };
        }
        if line.starts_with("USERNAME ") {
            return Self::Username;
        }
        if line.starts_with("PASSWORD ") {
            return Self::Password;
        }
        if let Some(ups) = line.strip_prefix("LIST VAR ") {
            return Self::ListVar { ups: ups.to_owned() };
        }
        if let Some(args) = line.strip_prefix("GET VAR ") {
            let mut tokens = args.split(' ');
            return match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(ups), Some(var), None) => Self::GetVar {
                    ups: ups.to_owned(),
                    var: var.to_owned(),
                },
                _ => Self::Invalid,
            };
        }
        if let Some(args) = line.strip_prefix("SET VAR ") {
            // Only the UPS and variable name are parsed; any value after
            // them is irrelevant since every variable is read-only.
            let mut tokens = args.splitn(3, ' ');
            return match (tokens.next(), tokens.next()) {
                (Some(ups), Some(var)) if !var.is_empty() => Self::SetVar {
                    ups: ups.to_owned(),
                    var: var.to_owned(),
                },
                _ => Self::Invalid,
            };
        }

        match line {
            "LOGOUT" => Self::Logout,
            "STARTTLS" => Self::StartTls,
            "LIST UPS" => Self::ListUps,
            _ => Self::Unknown,
        }
    }
}

/// Text to send back, plus whether the connection should close afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub text: String,
    pub close: bool,
}

impl Response {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: false,
        }
    }

    pub fn ok() -> Self {
        Self::line("OK")
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::line(format!("ERR {code}"))
    }

    fn goodbye() -> Self {
        Self {
            text: "OK Goodbye".into(),
            close: true,
        }
    }
}

/// Answer one request.
///
/// `LIST VAR` and `GET VAR` refresh the telemetry cache first; a failing
/// refresh or resolver aborts the request with the error and no response.
pub async fn dispatch<R: StatusRunner>(
    request: &Request,
    config: &ProxyConfig,
    cache: &mut TelemetryCache<R>,
) -> Result<Response, CoreError> {
    let response = match request {
        Request::Login { ups } => {
            if *ups == config.ups.name {
                Response::ok()
            } else {
                Response::error(ErrorCode::UnknownUps)
            }
        }
        Request::Username | Request::Password => Response::ok(),
        Request::Logout => Response::goodbye(),
        Request::StartTls => Response::error(ErrorCode::FeatureNotConfigured),
        Request::ListUps => list_ups(config),
        Request::ListVar { ups } => {
            if *ups != config.ups.name {
                return Ok(Response::error(ErrorCode::UnknownUps));
            }
            cache.refresh(config).await?;
            list_var(config, cache)?
        }
        Request::GetVar { ups, var } => {
            if *ups != config.ups.name {
                return Ok(Response::error(ErrorCode::UnknownUps));
            }
            cache.refresh(config).await?;
            get_var(config, cache, var)?
        }
        Request::SetVar { ups, .. } => {
            if *ups == config.ups.name {
                Response::error(ErrorCode::Readonly)
            } else {
                Response::error(ErrorCode::UnknownUps)
            }
        }
        Request::Invalid => Response::error(ErrorCode::InvalidArgument),
        Request::Unknown => Response::error(ErrorCode::UnknownCommand),
    };

    Ok(response)
}

fn list_ups(config: &ProxyConfig) -> Response {
    Response::line(format!(
        "BEGIN LIST UPS\nUPS {} \"{}\"\nEND LIST UPS\n",
        config.ups.name, config.ups.description
    ))
}

fn list_var<R: StatusRunner>(
    config: &ProxyConfig,
    cache: &TelemetryCache<R>,
) -> Result<Response, CoreError> {
    let ups = &config.ups.name;
    let mut text = format!("BEGIN LIST VAR {ups}\n");

    for (name, resolver) in config.variables.iter() {
        let value = resolver.resolve(name, config, cache.snapshot())?;
        if value.is_empty() {
            continue;
        }
        let _ = writeln!(text, "VAR {ups} {name} \"{value}\"");
    }

    let _ = writeln!(text, "END LIST VAR {ups}");
    Ok(Response::line(text))
}

fn get_var<R: StatusRunner>(
    config: &ProxyConfig,
    cache: &TelemetryCache<R>,
    var: &str,
) -> Result<Response, CoreError> {
    let Some(resolver) = config.variables.get(var) else {
        return Ok(Response::error(ErrorCode::VarNotSupported));
    };

    let value = resolver.resolve(var, config, cache.snapshot())?;
    Ok(Response::line(format!(
        "VAR {} {var} \"{value}\"\n",
        config.ups.name
    )))
}
