//! Execution engine
//!
//! Walks a parsed file in order, dispatching each statement to its handler.
//! Failures are reported where they happen and never stop the walk; the
//! caller only learns whether anything failed.

use crate::diagnostics::Diagnostic;
use crate::parser::{Block, ConfigFile, ConfigNode, Directive, Location, ParseErrors, Unresolved};
use crate::registry::{BlockStack, Outcome};
use crate::session::Session;
use amethyst_core::config::subtree_mut;
use amethyst_core::{ErrorKind, Scope};
use serde_json::Value;
use thiserror::Error;

/// At least one statement failed; see the session diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("configuration execution failed")]
pub struct ExecutionFailed;

impl Session {
    /// Execute a parse result against `config`
    ///
    /// A parse failure reports every entry and leaves `config` untouched.
    pub fn execute(
        &mut self,
        config: &mut Value,
        stack: &BlockStack,
        parsed: &Result<ConfigFile, ParseErrors>,
    ) -> Result<(), ExecutionFailed> {
        let file = match parsed {
            Ok(file) => file,
            Err(errors) => {
                for d in errors.diagnostics() {
                    self.report(d.clone());
                }
                return Err(ExecutionFailed);
            }
        };

        self.enter_file(&file.path);
        let result = self.execute_nodes(config, stack, &file.nodes);
        self.leave_file();
        result
    }

    /// Execute sibling statements in order
    pub fn execute_nodes(
        &mut self,
        config: &mut Value,
        stack: &BlockStack,
        nodes: &[ConfigNode],
    ) -> Result<(), ExecutionFailed> {
        let mut failed = false;
        for node in nodes {
            let ok = match node {
                ConfigNode::Directive(d) => self.run_directive(config, stack, d),
                ConfigNode::Block(b) => self.run_block(config, stack, b),
            };
            failed |= !ok;
        }
        if failed { Err(ExecutionFailed) } else { Ok(()) }
    }

    fn run_directive(&mut self, config: &mut Value, stack: &BlockStack, d: &Directive) -> bool {
        let Some(entry) = self.registry().directive(&d.name).cloned() else {
            self.report(
                Diagnostic::error(ErrorKind::Resolution, format!("no such directive: {}", d.name))
                    .at(&d.location),
            );
            return false;
        };

        let args = match self.env().interpolate_all(&d.args) {
            Ok(args) => args,
            Err(unresolved) => {
                self.report_unresolved(&d.location, unresolved);
                return false;
            }
        };

        let outcome = match entry.scope {
            Scope::Local => (entry.handler)(self, subtree_mut(config, &entry.module), stack, &args),
            Scope::Global => (entry.handler)(self, config, stack, &args),
        };
        self.settle(outcome, &d.location, &d.name)
    }

    fn run_block(&mut self, config: &mut Value, stack: &BlockStack, b: &Block) -> bool {
        let Some(entry) = self.registry().block(&b.name).cloned() else {
            self.report(
                Diagnostic::error(ErrorKind::Resolution, format!("no such block: {}", b.name))
                    .at(&b.location),
            );
            return false;
        };

        let args = match self.env().interpolate_all(&b.args) {
            Ok(args) => args,
            Err(unresolved) => {
                self.report_unresolved(&b.location, unresolved);
                return false;
            }
        };

        let outcome = (entry.handler)(self, config, stack, &args, b);
        self.settle(outcome, &b.location, &format!("<{}>", b.name))
    }

    fn report_unresolved(&mut self, location: &Location, unresolved: Vec<Unresolved>) {
        for u in unresolved {
            self.report(
                Diagnostic::error(ErrorKind::Environment, u.message)
                    .in_file(location.file.clone())
                    .at_line(location.line)
                    .with_context(format!("${}", u.name)),
            );
        }
    }

    /// Report an outcome against its statement; true unless it failed
    fn settle(&mut self, outcome: Outcome, location: &Location, name: &str) -> bool {
        match outcome {
            Outcome::Ok => true,
            Outcome::Warnings(messages) => {
                for m in messages {
                    self.report(Diagnostic::warning(m).at(location).with_context(name));
                }
                true
            }
            Outcome::Err(e) => {
                self.report(Diagnostic::from_error(&e).at(location).with_context(name));
                false
            }
            Outcome::EnvErr(unresolved) => {
                self.report_unresolved(location, unresolved);
                false
            }
            Outcome::Failed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::NoModules;
    use crate::parser::{Environment, parse};
    use serde_json::json;
    use std::sync::Arc;

    fn session() -> Session {
        Session::new(Arc::new(NoModules)).with_environment(Environment::new())
    }

    fn run(session: &mut Session, source: &str) -> (Value, Result<(), ExecutionFailed>) {
        let mut config = json!({"core": {}});
        let parsed = parse(source, "test.conf");
        let result = session.execute(&mut config, &BlockStack::new(), &parsed);
        (config, result)
    }

    fn lines(session: &Session) -> Vec<String> {
        session.diagnostics().iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_directives_update_core() {
        let mut s = session();
        let (config, result) = run(&mut s, "Listen 8080\nUser www-data\n");
        assert!(result.is_ok());
        assert_eq!(config["core"]["port"], json!(8080));
        assert_eq!(config["core"]["username"], json!("www-data"));
    }

    #[test]
    fn test_unknown_directive_continues() {
        let mut s = session();
        let (config, result) = run(&mut s, "Frobnicate now\nListen 80\n");
        assert_eq!(result, Err(ExecutionFailed));
        assert_eq!(config["core"]["port"], json!(80));
        assert_eq!(lines(&s), vec!["error: test.conf:1:1: no such directive: Frobnicate"]);
        assert_eq!(s.diagnostics()[0].kind, ErrorKind::Resolution);
    }

    #[test]
    fn test_unknown_block() {
        let mut s = session();
        let (_, result) = run(&mut s, "<Nowhere>\nListen 80\n</Nowhere>\n");
        assert!(result.is_err());
        assert_eq!(lines(&s), vec!["error: test.conf:1:1: no such block: Nowhere"]);
    }

    #[test]
    fn test_handler_error_format() {
        let mut s = session();
        let (_, result) = run(&mut s, "  Listen 99999\n");
        assert!(result.is_err());
        assert_eq!(
            lines(&s),
            vec!["error: test.conf:1:3: Listen: not a valid port number: 99999"]
        );
    }

    #[test]
    fn test_unresolved_variable() {
        let mut s = session();
        let (config, result) = run(&mut s, "PidFile ${UNSET}/a.pid\nListen 81\n");
        assert!(result.is_err());
        assert_eq!(config["core"]["port"], json!(81));
        assert!(config["core"].get("pidfile").is_none());
        assert_eq!(lines(&s), vec!["error: test.conf:1: $UNSET: no such environment variable"]);
        assert_eq!(s.diagnostics()[0].kind, ErrorKind::Environment);
    }

    #[test]
    fn test_parse_failure_leaves_config_untouched() {
        let mut s = session();
        let (config, result) = run(&mut s, "Listen 80\n<A>\n");
        assert!(result.is_err());
        assert_eq!(config, json!({"core": {}}));
        assert_eq!(s.diagnostics()[0].message, "blocks still left on the stack");
    }

    #[test]
    fn test_scope_error_inside_block() {
        let mut s = session();
        let (config, result) = run(&mut s, "<Endpoint /api>\nListen 80\n</Endpoint>\n");
        assert!(result.is_err());
        assert!(config["core"].get("port").is_none());
        assert_eq!(s.diagnostics()[0].kind, ErrorKind::Scope);
        assert_eq!(s.diagnostics()[0].line, Some(2));
    }

    #[test]
    fn test_setenv_then_conditional() {
        let mut s = session();
        let source = "\
SetEnv FOO bar
<IfEnvEq FOO bar>
  Header X-Foo ${FOO}
</IfEnvEq>
<IfEnvEq FOO baz>
  Header X-Baz yes
</IfEnvEq>
";
        let (config, result) = run(&mut s, source);
        assert!(result.is_ok(), "{:?}", lines(&s));
        assert_eq!(config["core"]["headers"], json!({"x-foo": "bar"}));
        assert_eq!(s.env().get("FOO"), Some("bar"));
    }

    #[test]
    fn test_top_level_directive_inside_conditional() {
        let mut s = session();
        let (config, result) = run(&mut s, "<IfNotEnv FOO>
  Listen 8080
</IfNotEnv>
");
        assert!(result.is_err());
        assert!(config["core"].get("port").is_none());
        assert_eq!(
            lines(&s),
            vec!["error: test.conf:2:3: Listen: directive not allowed inside blocks (found inside IfNotEnv)"]
        );
    }

    #[test]
    fn test_conditionals_run_children() {
        let mut s = session();
        let source = "\
SetEnv mode prod
<IfEnvEq MODE prod>
  Header X-Mode $MODE
</IfEnvEq>
<IfEnvEq MODE dev>
  Header X-Debug on
</IfEnvEq>
<IfEnv MODE>
  ErrorDocument 404 /404.html
</IfEnv>
<IfNotEnv MODE>
  ErrorDocument 500 /500.html
</IfNotEnv>
<IfModule CORE>
  Require local granted
</IfModule>
<IfModule tls>
  Require all denied
</IfModule>
UnsetEnv MODE
<IfNotEnv MODE>
  Header X-Unset yes
</IfNotEnv>
";
        let (config, result) = run(&mut s, source);
        assert!(result.is_ok(), "{:?}", lines(&s));
        let core = &config["core"];
        assert_eq!(core["headers"]["x-mode"], json!("prod"));
        assert!(core["headers"].get("x-debug").is_none());
        assert_eq!(core["headers"]["x-unset"], json!("yes"));
        assert_eq!(core["webpages"], json!({"404": "/404.html"}));
        assert_eq!(core["grant_ip"], json!(["::1", "127.0.0.0/8"]));
        assert_eq!(core["deny_ip"], json!([]));
    }

    #[test]
    fn test_endpoint_merges_per_module() {
        let mut s = session();
        let source = "\
<Endpoint /api /v2>
  Header X-Api yes
  Require 10.0.0.0/8 granted
</Endpoint>
<Endpoint /api>
  Header X-Extra 1
</Endpoint>
";
        let (config, result) = run(&mut s, source);
        assert!(result.is_ok(), "{:?}", lines(&s));
        let endpoints = &config["core"]["endpoints"];
        assert_eq!(endpoints["/api"]["core"]["headers"], json!({"x-api": "yes", "x-extra": "1"}));
        assert_eq!(endpoints["/v2"]["core"]["headers"], json!({"x-api": "yes"}));
        assert_eq!(endpoints["/v2"]["core"]["grant_ip"], json!(["10.0.0.0/8"]));
        assert!(config["core"].get("headers").is_none());
    }

    #[test]
    fn test_bad_conditional_argument() {
        let mut s = session();
        let (_, result) = run(&mut s, "<IfEnv 9BAD>\n</IfEnv>\n");
        assert!(result.is_err());
        assert_eq!(s.diagnostics()[0].kind, ErrorKind::Environment);
        assert_eq!(s.diagnostics()[0].context.as_deref(), Some("<IfEnv>"));
    }

    #[test]
    fn test_ifenvneq_needs_a_set_variable() {
        let mut s = session();
        let source = "\
<IfEnvNeq NOPE bar>
  Header X-Unset yes
</IfEnvNeq>
SetEnv NOPE baz
<IfEnvNeq NOPE bar>
  Header X-Differs yes
</IfEnvNeq>
<IfEnvNeq NOPE baz>
  Header X-Same yes
</IfEnvNeq>
";
        let (config, result) = run(&mut s, source);
        assert!(result.is_ok(), "{:?}", lines(&s));
        assert_eq!(config["core"]["headers"], json!({"x-differs": "yes"}));
    }

    #[test]
    fn test_block_error_context() {
        let mut s = session();
        let (_, result) = run(&mut s, "<Endpoint>
</Endpoint>
");
        assert!(result.is_err());
        assert_eq!(
            lines(&s),
            vec!["error: test.conf:1:1: <Endpoint>: expected at least one endpoint path"]
        );
    }
}
