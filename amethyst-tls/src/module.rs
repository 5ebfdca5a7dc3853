//! The `tls` module

use crate::settings::TlsSettings;
use amethyst_config::{BlockStack, DirectiveDef, EventDef, EventResult, Module};
use amethyst_core::{Error, Result};
use regex::Regex;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::LazyLock;

pub const MODULE_NAME: &str = "tls";

static SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid seconds regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct TlsModule;

fn required<'a>(args: &'a [String], missing: &str) -> Result<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| Error::validation(missing))
}

fn engine(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    let mode = required(args, "expected on or off")?.to_lowercase();
    let on = match mode.as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(Error::validation(format!("expected [on, off], got: {mode:?}"))),
    };
    config["usetls"] = json!(on);
    Ok(())
}

fn certificate_file(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    config["cert"] = json!(required(args, "expected path to TLS certificate file")?);
    Ok(())
}

fn key_file(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    config["privkey"] = json!(required(args, "expected path to TLS private key file")?);
    Ok(())
}

fn pfx_file(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    config["pfx"] = json!(required(args, "expected path to TLS PKCS #12 encrypted file")?);
    Ok(())
}

fn password_helper(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    let helper = required(args, "expected path to password prompting helper program")?;
    check_helper(Path::new(helper))?;
    config["passwd"] = json!(helper);
    Ok(())
}

/// The helper must be a regular file anyone can execute
fn check_helper(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .map_err(|_| Error::validation(format!("no such file: {:?}", path.display().to_string())))?;
    if !meta.is_file() {
        return Err(Error::validation("expected a path to a regular file"));
    }
    if !world_executable(&meta) {
        return Err(Error::validation("file at location is not world-executable"));
    }
    Ok(())
}

#[cfg(unix)]
fn world_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o001 != 0
}

#[cfg(not(unix))]
fn world_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

fn handshake_timeout(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    let seconds = required(args, "no time duration given")?;
    if !SECONDS_RE.is_match(seconds) {
        return Err(Error::validation(format!("not a valid positive integer: {seconds:?}")));
    }
    let whole = seconds.split('.').next().unwrap_or(seconds);
    let value: u64 = whole
        .parse()
        .map_err(|_| Error::validation(format!("number out of range: {seconds:?}")))?;
    config["timeout"] = json!(value);
    Ok(())
}

fn postconfig(config: &mut Value) -> EventResult {
    let checked = TlsSettings::from_value(config).and_then(|settings| {
        settings.validate()?;
        Ok(settings)
    });
    match checked {
        Ok(settings) => {
            tracing::debug!("TLS settings: {:?}", settings);
            EventResult::Pass
        }
        Err(e) => EventResult::Fail(e.to_string()),
    }
}

impl Module for TlsModule {
    fn name(&self) -> Option<&str> {
        Some(MODULE_NAME)
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![
            DirectiveDef::checked("TLSEngine", engine),
            DirectiveDef::checked("TLSCertificateFile", certificate_file),
            DirectiveDef::checked("TLSKeyFile", key_file),
            DirectiveDef::checked("TLSPasswordHelper", password_helper),
            DirectiveDef::checked("TLSPFXFile", pfx_file),
            DirectiveDef::checked("TLSHandshakeTimeout", handshake_timeout),
        ]
    }

    fn events(&self) -> Vec<EventDef> {
        vec![EventDef::new("postconfig", |config, _| postconfig(config))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amethyst_config::{Environment, LoadError, LoaderOptions, ModuleSource, Session};
    use std::sync::Arc;

    struct OnlyTls;

    impl ModuleSource for OnlyTls {
        fn load(&self, _locator: &Path) -> Result<Box<dyn Module>> {
            Ok(Box::new(TlsModule))
        }
    }

    fn load(body: &str) -> std::result::Result<amethyst_config::Loaded, LoadError> {
        let options = LoaderOptions {
            inherit_environment: false,
            ..LoaderOptions::default()
        };
        Session::with_options(Arc::new(OnlyTls), options)
            .with_environment(Environment::new())
            .load_str(body, "tls.conf")
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_engine() {
        let mut config = json!({});
        engine(&mut config, &BlockStack::new(), &args(&["ON"])).unwrap();
        assert_eq!(config["usetls"], json!(true));
        let err = engine(&mut config, &BlockStack::new(), &args(&["maybe"])).unwrap_err();
        assert_eq!(err.message(), "expected [on, off], got: \"maybe\"");
        assert!(engine(&mut config, &BlockStack::new(), &[]).is_err());
    }

    #[test]
    fn test_handshake_timeout() {
        let mut config = json!({});
        handshake_timeout(&mut config, &BlockStack::new(), &args(&["7.9"])).unwrap();
        assert_eq!(config["timeout"], json!(7));
        assert!(handshake_timeout(&mut config, &BlockStack::new(), &args(&["-1"])).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_password_helper() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let helper = dir.path().join("askpass");
        std::fs::write(&helper, "#!/bin/sh\necho secret\n").unwrap();
        let path = helper.to_string_lossy().to_string();

        std::fs::set_permissions(&helper, std::fs::Permissions::from_mode(0o750)).unwrap();
        let mut config = json!({});
        let err = password_helper(&mut config, &BlockStack::new(), &args(&[&path])).unwrap_err();
        assert_eq!(err.message(), "file at location is not world-executable");

        std::fs::set_permissions(&helper, std::fs::Permissions::from_mode(0o755)).unwrap();
        password_helper(&mut config, &BlockStack::new(), &args(&[&path])).unwrap();
        assert_eq!(config["passwd"], json!(path));

        let dir_path = dir.path().to_string_lossy().to_string();
        let err = password_helper(&mut config, &BlockStack::new(), &args(&[&dir_path])).unwrap_err();
        assert_eq!(err.message(), "expected a path to a regular file");

        let missing = dir.path().join("nope").to_string_lossy().to_string();
        let err = password_helper(&mut config, &BlockStack::new(), &args(&[&missing])).unwrap_err();
        assert!(err.message().starts_with("no such file: "));
    }

    #[test]
    fn test_loaded_through_session() {
        let body = "\
LoadModule 20 mod_tls
TLSEngine on
TLSCertificateFile /etc/amethyst/cert.pem
TLSKeyFile /etc/amethyst/key.pem
TLSHandshakeTimeout 10
";
        let loaded = load(body).unwrap();
        let tls = TlsSettings::from_value(loaded.config.module("tls").unwrap()).unwrap();
        assert!(tls.usetls);
        assert_eq!(tls.cert.as_deref(), Some("/etc/amethyst/cert.pem"));
        assert_eq!(tls.timeout, Some(10));
        assert_eq!(loaded.events.frames("postconfig")[0].module, "tls");
    }

    #[test]
    fn test_postconfig_rejects_engine_without_identity() {
        let err = load("LoadModule 20 mod_tls\nTLSEngine on\n").unwrap_err();
        let lines: Vec<String> = err.diagnostics().iter().map(|d| d.to_string()).collect();
        assert_eq!(
            lines,
            vec!["error: tls: TLS engine enabled without a certificate and key or a PFX file"]
        );
    }

    #[test]
    fn test_endpoint_scoped_settings() {
        let body = "\
LoadModule 20 mod_tls
<Endpoint /secure>
  TLSEngine on
</Endpoint>
";
        let loaded = load(body).unwrap();
        let core = loaded.config.core().unwrap();
        assert_eq!(core["endpoints"]["/secure"]["tls"]["usetls"], json!(true));
    }
}
