//! Server-wide `core` directives

use crate::registry::BlockStack;
use amethyst_core::config::{object_mut, subtree_mut};
use amethyst_core::{Error, PLATFORM, PRODUCT, Result, VERSION};
use chrono::Local;
use http::StatusCode;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid number regex"));

static TZ_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{3}$").expect("valid zone name regex"));

static TZ_OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-][0-9]{2}:?[0-9]{2}$").expect("valid zone offset regex"));

/// Headers that are owned by the server and cannot be overridden
const RESERVED_HEADERS: &[&str] = &[
    "server",
    "content-type",
    "content-length",
    "connection",
    "upgrade",
    "sec-websocket-accept",
];

pub(super) fn arg<'a>(args: &'a [String], idx: usize, missing: &str) -> Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| Error::validation(missing))
}

pub(super) fn set(config: &mut Value, key: &str, value: impl Into<Value>) {
    object_mut(config).insert(key.to_string(), value.into());
}

/// Integer part of a non-negative decimal
fn whole_number(value: &str) -> Result<u64> {
    if !NUMBER_RE.is_match(value) {
        return Err(Error::validation(format!("not a valid positive integer: {value:?}")));
    }
    let digits = value.split('.').next().unwrap_or(value);
    digits
        .parse()
        .map_err(|_| Error::validation(format!("number out of range: {value:?}")))
}

pub(super) fn pid_file(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let file = arg(args, 0, "no filename given")?;
    set(config, "pidfile", file);
    Ok(())
}

pub(super) fn timeout(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let seconds = whole_number(arg(args, 0, "no time duration given")?)?;
    set(config, "timeout", seconds);
    Ok(())
}

pub(super) fn user(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let name = arg(args, 0, "username argument missing")?;
    set(config, "username", name);
    Ok(())
}

pub(super) fn group(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let name = arg(args, 0, "group name argument missing")?;
    set(config, "groupname", name);
    Ok(())
}

pub(super) fn error_log(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let file = arg(args, 0, "must specify filename")?;
    let logs = object_mut(subtree_mut(config, "logs"));
    let errors = logs.entry("error").or_insert_with(|| json!([]));
    if !errors.is_array() {
        *errors = json!([]);
    }
    if let Value::Array(list) = errors {
        list.push(json!(file));
    }
    Ok(())
}

pub(super) fn listen(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let raw = arg(args, 0, "must specify a port number")?;
    let port = whole_number(raw)?;
    if port >= 65536 {
        return Err(Error::validation(format!("not a valid port number: {port}")));
    }
    if port == 0 || port >= 49152 {
        return Err(Error::validation(format!("not a listenable port number: {port}")));
    }
    set(config, "port", port);
    Ok(())
}

pub(super) fn error_document(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    let code = arg(args, 0, "two arguments required: status code and filename")?;
    let file = arg(args, 1, "filename argument not specified")?;

    let known = code
        .parse::<u16>()
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .is_some_and(|s| s.canonical_reason().is_some());
    if !known {
        return Err(Error::validation(format!("no such status code: {code}")));
    }

    set(subtree_mut(config, "webpages"), code, file);
    Ok(())
}

pub(super) fn server_tokens(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let token = arg(args, 0, "missing token type")?.to_lowercase();
    let headers = object_mut(subtree_mut(config, "headers"));

    let value = match token.as_str() {
        "full" => format!("{PRODUCT}/{VERSION} ({PLATFORM})"),
        "min" | "minimal" => format!("{PRODUCT}/{VERSION}"),
        "prod" | "productonly" => PRODUCT.to_string(),
        "gone" => {
            headers.remove("server");
            return Ok(());
        }
        _ => return Err(Error::validation(format!("unknown token type: {token:?}"))),
    };
    headers.insert("server".to_string(), json!(value));
    Ok(())
}

pub(super) fn header(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    let name = arg(args, 0, "missing header-value arguments")?.to_lowercase();
    let value = arg(args, 1, "missing value argument")?;

    if name == "server" {
        return Err(Error::validation(
            "not allowed to set server header; use ServerTokens directive",
        ));
    }
    if RESERVED_HEADERS.contains(&name.as_str()) {
        return Err(Error::validation(format!("not allowed to set header: {name:?}")));
    }

    set(subtree_mut(config, "headers"), &name, value);
    Ok(())
}

pub(super) fn remote_host_mode(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let mode = arg(args, 0, "missing argument: mode")?.to_lowercase();
    let proxy = match mode.as_str() {
        "proxy" => true,
        "head" => false,
        _ => return Err(Error::validation(format!("unrecognized mode: {mode:?}"))),
    };
    set(config, "proxy", proxy);
    Ok(())
}

pub(super) fn access_log_format(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let format = arg(args, 0, "missing format string")?;
    let name = arg(args, 1, "no name given for format string")?;
    if name.is_empty() {
        return Err(Error::validation("name must be longer than zero characters"));
    }

    let logs = subtree_mut(config, "logs");
    set(subtree_mut(logs, "access_format"), name, format);
    Ok(())
}

pub(super) fn time_format(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let format = arg(args, 0, "missing format string")?;
    set(subtree_mut(config, "logs"), "timefmt", format);
    Ok(())
}

pub(super) fn time_zone(config: &mut Value, stack: &BlockStack, args: &[String]) -> Result<()> {
    stack.require_top_level()?;
    let zone = arg(args, 0, "at least one argument required")?;
    let offset = args.get(1).map(String::as_str);

    let tz = match (zone.to_lowercase().as_str(), offset) {
        ("system", _) => {
            let now = Local::now();
            json!({"name": "system", "time": now.format("%z").to_string()})
        }
        ("z" | "zulu", _) => json!({"name": "UTC", "time": "+0000"}),
        (_, Some(offset)) if TZ_NAME_RE.is_match(zone) && TZ_OFFSET_RE.is_match(offset) => {
            json!({"name": zone.to_uppercase(), "time": offset.replace(':', "")})
        }
        (_, Some(offset)) => {
            return Err(Error::validation(format!(
                "invalid timezone spec: {:?}",
                format!("{} {}", zone.to_uppercase(), offset)
            )));
        }
        (_, None) => {
            return Err(Error::validation(format!(
                "invalid timezone string: {:?}",
                zone.to_uppercase()
            )));
        }
    };

    set(subtree_mut(config, "logs"), "tz", tz);
    Ok(())
}
