//! End-to-end loading scenarios: includes, modules and events.

use amethyst_config::{
    DirectiveDef, Severity, Environment, EventArgs, EventDef, EventResult, LoadError, Loaded, LoaderOptions,
    Module, ModuleSource, Outcome, Session, TableOrder,
};
use amethyst_core::{Error, ErrorKind, Result};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Module answering to `Greeting <text>` and checking it after configuration
struct Greeter;

impl Module for Greeter {
    fn name(&self) -> Option<&str> {
        Some("greeter")
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![DirectiveDef::checked("Greeting", |config, _stack, args| {
            let text = args
                .first()
                .ok_or_else(|| Error::validation("missing greeting"))?;
            config["text"] = json!(text);
            Ok(())
        })]
    }

    fn events(&self) -> Vec<EventDef> {
        vec![
            EventDef::new("load", |config, _| {
                config["loaded"] = json!(true);
                EventResult::Pass
            }),
            EventDef::new("postconfig", |config, _| {
                if config.get("text").is_some() {
                    EventResult::Pass
                } else {
                    EventResult::Fail("no greeting configured".to_string())
                }
            }),
        ]
    }
}

/// Nameless module, known by its file stem
struct Anonymous;

impl Module for Anonymous {
    fn directives(&self) -> Vec<DirectiveDef> {
        vec![DirectiveDef::new("Shout", |_, config, _, args| {
            config["shout"] = json!(args.join(" ").to_uppercase());
            Outcome::Warnings(vec!["shouting is rude".to_string()])
        })]
    }
}

/// Module that panics in its handler
struct Fragile;

impl Module for Fragile {
    fn name(&self) -> Option<&str> {
        Some("fragile")
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![DirectiveDef::new("Break", |_, _, _, _| panic!("handler exploded"))]
    }
}

/// Module that claims a `core` directive
struct Hijacker;

impl Module for Hijacker {
    fn name(&self) -> Option<&str> {
        Some("hijacker")
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![DirectiveDef::checked("Listen", |_, _, _| Ok(()))]
    }
}

/// Module with a failing load hook
struct Broken;

impl Module for Broken {
    fn name(&self) -> Option<&str> {
        Some("broken")
    }

    fn events(&self) -> Vec<EventDef> {
        vec![EventDef::new("load", |_, _| EventResult::Fail("missing resources".to_string()))]
    }
}

/// Module that also answers to `Greeting`
struct Impostor;

impl Module for Impostor {
    fn name(&self) -> Option<&str> {
        Some("impostor")
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![DirectiveDef::checked("Greeting", |_, _, _| Ok(()))]
    }
}

/// Modules by file stem
struct Fixtures;

impl ModuleSource for Fixtures {
    fn load(&self, locator: &Path) -> Result<Box<dyn Module>> {
        let stem = locator.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let module: Box<dyn Module> = match stem {
            "greeter" => Box::new(Greeter),
            "anonymous" => Box::new(Anonymous),
            "fragile" => Box::new(Fragile),
            "hijacker" => Box::new(Hijacker),
            "broken" => Box::new(Broken),
            "impostor" => Box::new(Impostor),
            "exploding" => panic!("cannot even load"),
            _ => return Err(Error::module_load(format!("no such module: {}", locator.display()))),
        };
        Ok(module)
    }
}

fn session(dir: &TempDir) -> Session {
    let options = LoaderOptions {
        working_dir: dir.path().to_path_buf(),
        inherit_environment: false,
    };
    Session::with_options(Arc::new(Fixtures), options).with_environment(
        [("HOME", "/home/amethyst")].into_iter().collect::<Environment>(),
    )
}

fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}

fn load(dir: &TempDir, body: &str) -> std::result::Result<Loaded, LoadError> {
    let path = write(dir, "amethyst.conf", body);
    session(dir).load_file(path)
}

fn messages(err: &LoadError) -> Vec<String> {
    err.diagnostics().iter().map(|d| d.message.clone()).collect()
}

#[test]
fn test_include_glob_in_sorted_order() {
    let dir = TempDir::new().unwrap();
    write(&dir, "conf.d/20-b.conf", "Header X-Order b\n");
    write(&dir, "conf.d/10-a.conf", "Header X-Order a\nHeader X-A yes\n");
    write(&dir, "conf.d/notes.txt", "this is not configuration\n");

    let loaded = load(&dir, "Listen 8080\nInclude conf.d/*.conf\n").unwrap();
    let settings = loaded.config.core_settings().unwrap();
    assert_eq!(settings.port, Some(8080));
    assert_eq!(settings.headers.get("x-order").map(String::as_str), Some("b"));
    assert_eq!(settings.headers.get("x-a").map(String::as_str), Some("yes"));
}

#[test]
fn test_include_inside_endpoint_keeps_block_stack() {
    let dir = TempDir::new().unwrap();
    write(&dir, "api.conf", "Header X-Api yes\n");
    write(&dir, "bad.conf", "Listen 80\n");

    let loaded = load(&dir, "<Endpoint /api>\n  Include api.conf\n</Endpoint>\n").unwrap();
    let core = loaded.config.core().unwrap();
    assert_eq!(core["endpoints"]["/api"]["core"]["headers"]["x-api"], json!("yes"));

    let err = load(&dir, "<Endpoint /api>\n  Include bad.conf\n</Endpoint>\n").unwrap_err();
    let scope = &err.diagnostics()[0];
    assert_eq!(scope.kind, ErrorKind::Scope);
    assert!(scope.file.as_deref().unwrap().ends_with("bad.conf"));
}

#[test]
fn test_include_errors() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.conf", "<Endpoint /x>\n");

    let err = load(&dir, "Include missing.conf\nInclude broken.conf\nListen 80\n").unwrap_err();
    assert!(matches!(err, LoadError::Execution(_)));
    assert_eq!(
        messages(&err),
        vec!["no such file", "blocks still left on the stack"]
    );
}

#[test]
fn test_include_cycle() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.conf", "Include b.conf\n");
    write(&dir, "b.conf", "Include a.conf\n");

    let err = session(&dir).load_file(dir.path().join("a.conf")).unwrap_err();
    assert!(messages(&err)[0].starts_with("include cycle detected"));
}

#[test]
fn test_parse_errors_fail_the_load() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "Listen 80\n</Endpoint>\nUser \"web\n").unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
    let lines: Vec<String> = err.diagnostics().iter().map(|d| d.to_string()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("amethyst.conf:2:"));
    assert!(lines[1].ends_with("unclosed quotes"));
}

#[test]
fn test_interpolation_from_session_environment() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&dir, "PidFile ${HOME}/amethyst.pid\nSetEnv LOGS $HOME/logs\nErrorLog $LOGS/error.log\n")
        .unwrap();
    let settings = loaded.config.core_settings().unwrap();
    assert_eq!(settings.pidfile.as_deref(), Some("/home/amethyst/amethyst.pid"));
    assert_eq!(settings.logs.error, vec!["/home/amethyst/logs/error.log"]);
    assert_eq!(loaded.env.get("LOGS"), Some("/home/amethyst/logs"));
}

#[test]
fn test_load_module() {
    let dir = TempDir::new().unwrap();
    let body = "\
LoadModule 10 modules/greeter.so
Greeting hello
<IfModule GREETER>
  Header X-Greeter on
</IfModule>
<Endpoint /hi>
  Greeting hi
</Endpoint>
";
    let loaded = load(&dir, body).unwrap();
    assert_eq!(loaded.modules, vec!["core", "greeter"]);

    let greeter = loaded.config.module("greeter").unwrap();
    assert_eq!(greeter, &json!({"loaded": true, "text": "hello"}));

    let core = loaded.config.core().unwrap();
    assert_eq!(core["headers"]["x-greeter"], json!("on"));
    assert_eq!(core["endpoints"]["/hi"]["greeter"]["text"], json!("hi"));

    let frames = loaded.events.frames("postconfig");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].module, "greeter");
    assert!(loaded.events.frames("load").is_empty());
}

#[test]
fn test_module_used_before_loading() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "Greeting early\nLoadModule 10 greeter\nGreeting late\n").unwrap_err();
    assert_eq!(messages(&err), vec!["no such directive: Greeting"]);
    assert_eq!(err.diagnostics()[0].kind, ErrorKind::Resolution);
}

#[test]
fn test_postconfig_failure() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "LoadModule 10 greeter\n").unwrap_err();
    let lines: Vec<String> = err.diagnostics().iter().map(|d| d.to_string()).collect();
    assert_eq!(lines, vec!["error: greeter: no greeting configured"]);
}

#[test]
fn test_module_named_by_file_stem() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&dir, "LoadModule 5 anonymous.so\nShout quiet please\n").unwrap();
    assert_eq!(loaded.config.module("anonymous").unwrap()["shout"], json!("QUIET PLEASE"));
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].to_string(), format!(
        "warning: {}:2:1: Shout: shouting is rude",
        dir.path().join("amethyst.conf").display()
    ));
}

#[test]
fn test_module_load_errors() {
    let dir = TempDir::new().unwrap();
    let body = "\
LoadModule 10 greeter
LoadModule 20 greeter
LoadModule 10 hijacker
LoadModule 10 nowhere
LoadModule ten greeter
LoadModule 10 broken
LoadModule 10 exploding
Greeting still-works
Listen 8080
";
    let err = load(&dir, body).unwrap_err();
    let msgs = messages(&err);
    assert_eq!(msgs.len(), 6, "{msgs:?}");
    assert_eq!(msgs[0], "module \"greeter\" is already loaded");
    assert_eq!(msgs[1], "directive \"Listen\" conflicts with module \"core\"");
    assert!(msgs[2].starts_with("no such module: "));
    assert_eq!(msgs[3], "invalid priority: not a number: \"ten\"");
    assert_eq!(msgs[4], "load handler failed: missing resources");
    assert!(!err.diagnostics()[4].is_error());
    assert!(msgs[5].contains("cannot even load"), "{}", msgs[5]);

    let kinds: Vec<ErrorKind> = err.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds[0], ErrorKind::ModuleLoad);
    assert_eq!(kinds[3], ErrorKind::Validation);
}

#[test]
fn test_rejected_module_leaves_session_untouched() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "LoadModule 10 hijacker\n<IfModule hijacker>\n  Frobnicate\n</IfModule>\n")
        .unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
}

#[test]
fn test_panicking_handler_is_contained() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "LoadModule 1 fragile\nBreak now\nListen 8080\n").unwrap_err();
    let diagnostic = &err.diagnostics()[0];
    assert_eq!(diagnostic.kind, ErrorKind::ModuleLoad);
    assert_eq!(diagnostic.context.as_deref(), Some("Break"));
    assert_eq!(
        diagnostic.message,
        "uncaught panic in module fragile: handler exploded"
    );
}

#[test]
fn test_connection_gate() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&dir, "Require 10.0.0.0/8 granted\nRequire 10.1.0.0/16 denied\n").unwrap();
    let mut config: Value = loaded.config.into_value();

    let verdict = |config: &mut Value, ip: &str| {
        let args = EventArgs::Connection(amethyst_config::ConnectionInfo {
            client: ip.parse().unwrap(),
            local: None,
        });
        loaded.events.dispatch("connection", config, &args)[0].result.clone()
    };
    assert_eq!(verdict(&mut config, "10.2.3.4"), EventResult::Pass);
    assert_eq!(verdict(&mut config, "10.1.3.4"), EventResult::Close);
    assert_eq!(verdict(&mut config, "192.168.1.1"), EventResult::Close);
}

#[test]
fn test_event_table() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&dir, "LoadModule 10 greeter\nGreeting hi\n").unwrap();
    let table = loaded.events.table(TableOrder::Priority);
    let lines: Vec<&str> = table.lines().collect();
    assert!(lines[0].contains("ConfigAccess"));
    assert!(lines[2].contains("greeter") && lines[2].contains("postconfig"));
    assert!(lines[3].contains("core") && lines[3].contains("connection"));

    let by_id = loaded.events.table(TableOrder::Id);
    assert!(by_id.lines().nth(2).unwrap().contains("connection"));
}

#[test]
fn test_sessions_are_independent() {
    let dir = TempDir::new().unwrap();
    let first = load(&dir, "LoadModule 10 greeter\nGreeting hi\n").unwrap();
    assert!(first.config.module("greeter").is_some());

    let second = load(&dir, "Listen 8080\n").unwrap();
    assert_eq!(second.modules, vec!["core"]);
    let err = load(&dir, "Greeting hi\n").unwrap_err();
    assert_eq!(messages(&err), vec!["no such directive: Greeting"]);
}

#[test]
fn test_failed_load_hook_is_only_reported() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&dir, "LoadModule 10 broken\nListen 8080\n").unwrap();
    assert_eq!(loaded.modules, vec!["core", "broken"]);
    assert_eq!(loaded.config.core_settings().unwrap().port, Some(8080));

    let warning = &loaded.warnings[0];
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.context.as_deref(), Some("LoadModule"));
    assert_eq!(warning.message, "load handler failed: missing resources");
}

#[test]
fn test_same_identity_from_another_path() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "LoadModule 10 greeter\nLoadModule 20 other/greeter.so\nGreeting hi\n")
        .unwrap_err();
    assert_eq!(messages(&err), vec!["module \"greeter\" is already loaded"]);
    assert_eq!(err.diagnostics()[0].line, Some(2));
}

#[test]
fn test_two_modules_claiming_one_directive() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir, "LoadModule 10 greeter\nLoadModule 20 impostor\nGreeting hi\n")
        .unwrap_err();
    assert_eq!(
        messages(&err),
        vec!["directive \"Greeting\" conflicts with module \"greeter\""]
    );
    assert_eq!(err.diagnostics()[0].kind, ErrorKind::ModuleLoad);
}

#[test]
fn test_ifenvneq_with_unset_variable() {
    let dir = TempDir::new().unwrap();
    let body = "<IfEnvNeq NOPE bar>\n  Header X-Ran yes\n</IfEnvNeq>\n";
    let loaded = load(&dir, body).unwrap();
    assert!(loaded.config.core_settings().unwrap().headers.is_empty());
}
