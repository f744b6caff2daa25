//! Python interpreter adapter.
//!
//! All introspection happens in short-lived child interpreters so that
//! importing a dependency can never disturb this process. Each helper
//! script prints a single JSON document on its last line of stdout; any
//! output produced by the code being imported is swallowed inside the child.

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

use super::{Attribute, Callable, ImportError, LoadedModule, ModuleLoader};
use crate::discovery::{AnalyzedModule, ImportAnalyzer};
use crate::error::{DepprovError, Result};
use crate::shell::{self, CommandOptions, CommandResult};

/// Environment facts reported by the interpreter.
const ENVIRONMENT_SCRIPT: &str = r#"
import json, sys, sysconfig
paths = sysconfig.get_paths()
print(json.dumps({
    "version": "%d.%d.%d" % tuple(sys.version_info[:3]),
    "stdlib": paths["stdlib"],
    "purelib": paths["purelib"],
    "sys_path": sys.path[1:],
}))
"#;

const LOCATE_SCRIPT: &str = r#"
import importlib.util, json, sys
del sys.path[0]
name = sys.argv[1]
try:
    spec = importlib.util.find_spec(name)
except Exception as e:
    spec, error = None, "%s: %s" % (type(e).__name__, e)
else:
    error = "No module named %r" % name
if spec is not None and spec.submodule_search_locations:
    print(json.dumps({"path": list(spec.submodule_search_locations)[0]}))
elif spec is not None and spec.origin not in (None, "built-in", "frozen"):
    print(json.dumps({"path": spec.origin}))
elif spec is not None:
    print(json.dumps({"error": "%r is built into the interpreter" % name}))
else:
    print(json.dumps({"error": error}))
"#;

const IMPORT_SCRIPT: &str = r#"
import contextlib, importlib, io, json, sys, types
del sys.path[0]
NAMES = ("version", "get_version", "__version__", "VERSION")
MAX_DEPTH = 4

def describe(module, depth):
    attributes = {}
    for attr in NAMES:
        try:
            if not hasattr(module, attr):
                continue
            value = getattr(module, attr)
        except Exception:
            continue
        if isinstance(value, types.ModuleType):
            if depth < MAX_DEPTH:
                attributes[attr] = {"kind": "module", "module": describe(value, depth + 1)}
            else:
                attributes[attr] = {"kind": "null"}
        elif callable(value):
            attributes[attr] = {"kind": "callable"}
        elif value is None:
            attributes[attr] = {"kind": "null"}
        else:
            attributes[attr] = {"kind": "value", "value": str(value)}
    path = getattr(module, "__path__", None)
    return {
        "name": module.__name__,
        "file": getattr(module, "__file__", None),
        "package_root": list(path)[0] if path else None,
        "attributes": attributes,
    }

name = sys.argv[1]
try:
    with contextlib.redirect_stdout(io.StringIO()):
        reply = {"module": describe(importlib.import_module(name), 0)}
except BaseException as e:
    reply = {"error": "%s: %s" % (type(e).__name__, e)}
print(json.dumps(reply))
"#;

const CALL_SCRIPT: &str = r#"
import contextlib, importlib, io, json, sys
del sys.path[0]
with contextlib.redirect_stdout(io.StringIO()):
    target = importlib.import_module(sys.argv[1])
    for part in sys.argv[2].split("."):
        target = getattr(target, part)
    result = target()
print(json.dumps(None if result is None else str(result)))
"#;

const ANALYZE_SCRIPT: &str = r#"
import contextlib, io, json, sys
from modulefinder import ModuleFinder
finder = ModuleFinder(path=json.loads(sys.argv[2]), debug=2)
with contextlib.redirect_stdout(io.StringIO()):
    finder.run_script(sys.argv[1])
modules = {}
for name, module in finder.modules.items():
    path = module.__path__
    modules[name] = {
        "path": path[0] if path else module.__file__,
        "is_package": bool(path),
    }
print(json.dumps(modules))
"#;

/// Facts about an interpreter installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PythonEnvironment {
    /// `major.minor.micro`
    pub version: String,

    /// Standard-library root.
    pub stdlib: PathBuf,

    /// Site-packages directory for pure-Python distributions.
    pub purelib: PathBuf,

    /// Library search path, without the entry inserted for the invoking context.
    pub sys_path: Vec<PathBuf>,
}

/// A Python interpreter driven through subprocesses.
#[derive(Debug, Clone)]
pub struct PythonInterpreter {
    executable: PathBuf,
    timeout: Duration,
    extra_path: Vec<PathBuf>,
}

impl PythonInterpreter {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            extra_path: Vec::new(),
        }
    }

    /// Prepend `paths` to the module search path of every child interpreter.
    pub fn with_extra_path(mut self, paths: Vec<PathBuf>) -> Self {
        self.extra_path = paths;
        self
    }

    /// Path (or bare command name) of the interpreter binary.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Query version, library roots, and search path.
    pub fn environment(&self) -> Result<PythonEnvironment> {
        let result = self.run_script(ENVIRONMENT_SCRIPT, Vec::<&OsStr>::new())?;
        if !result.success {
            return Err(DepprovError::CommandFailed {
                command: format!("{} -c <environment>", self.executable.display()),
                code: result.exit_code,
            });
        }
        Ok(parse_reply(&result.stdout)?)
    }

    fn run_script<I, S>(&self, script: &str, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut argv: Vec<OsString> = vec!["-c".into(), script.into()];
        argv.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        let mut options = CommandOptions {
            timeout: self.timeout,
            ..Default::default()
        };
        if !self.extra_path.is_empty() {
            let joined = std::env::join_paths(&self.extra_path)
                .context("extra search path contains a separator")?;
            options.env.insert("PYTHONPATH".to_string(), joined);
        }
        shell::run(&self.executable, argv, &options)
    }

    fn call_attribute(&self, module: &str, attr_path: &str) -> anyhow::Result<Option<String>> {
        let result = self
            .run_script(CALL_SCRIPT, [module, attr_path])
            .with_context(|| format!("calling {module}.{attr_path}"))?;
        if !result.success {
            return Err(anyhow!(
                "{module}.{attr_path}() failed: {}",
                last_line(&result.stderr).unwrap_or("no output")
            ));
        }
        parse_reply(&result.stdout)
    }

    fn snapshot_to_module(&self, top: &str, prefix: &str, snapshot: ModuleSnapshot) -> LoadedModule {
        let mut module = LoadedModule::new(&snapshot.name);
        module.file = snapshot.file;
        module.package_root = snapshot.package_root;

        for (attr, value) in snapshot.attributes {
            let attr_path = if prefix.is_empty() {
                attr.clone()
            } else {
                format!("{prefix}.{attr}")
            };
            let attribute = match value {
                AttributeSnapshot::Null => Attribute::Null,
                AttributeSnapshot::Value { value } => Attribute::Value(value),
                AttributeSnapshot::Callable => {
                    let interpreter = self.clone();
                    let top = top.to_string();
                    Attribute::Callable(Callable::new(move || {
                        interpreter.call_attribute(&top, &attr_path)
                    }))
                }
                AttributeSnapshot::Module { module: nested } => {
                    Attribute::Module(self.snapshot_to_module(top, &attr_path, nested))
                }
            };
            module = module.with_attribute(&attr, attribute);
        }
        module
    }
}

impl ModuleLoader for PythonInterpreter {
    fn locate(&self, name: &str) -> Result<PathBuf> {
        let result = self.run_script(LOCATE_SCRIPT, [name])?;
        let lookup_failed = |message: String| DepprovError::LookupFailed {
            name: name.to_string(),
            message,
        };
        if !result.success {
            return Err(lookup_failed(
                last_line(&result.stderr).unwrap_or("interpreter failed").to_string(),
            ));
        }
        match parse_reply::<LocateReply>(&result.stdout).map_err(|e| lookup_failed(e.to_string()))? {
            LocateReply::Path(path) => Ok(path),
            LocateReply::Error(message) => Err(lookup_failed(message)),
        }
    }

    fn import(&self, name: &str) -> std::result::Result<LoadedModule, ImportError> {
        let result = self
            .run_script(IMPORT_SCRIPT, [name])
            .map_err(|e| ImportError::new(name, e.to_string()))?;
        if !result.success {
            return Err(ImportError::new(
                name,
                last_line(&result.stderr).unwrap_or("interpreter failed"),
            ));
        }
        match parse_reply::<ImportReply>(&result.stdout)
            .map_err(|e| ImportError::new(name, e.to_string()))?
        {
            ImportReply::Module(snapshot) => Ok(self.snapshot_to_module(name, "", snapshot)),
            ImportReply::Error(message) => Err(ImportError::new(name, message)),
        }
    }
}

impl ImportAnalyzer for PythonInterpreter {
    fn analyze(
        &self,
        script: &Path,
        search_path: &[PathBuf],
    ) -> Result<BTreeMap<String, AnalyzedModule>> {
        let search_path = serde_json::to_string(search_path).map_err(anyhow::Error::from)?;
        let result = self.run_script(
            ANALYZE_SCRIPT,
            [script.as_os_str(), OsStr::new(&search_path)],
        )?;
        trace!(bytes = result.stderr.len(), "discarding analyzer diagnostics");
        if !result.success {
            return Err(DepprovError::DiscoveryFailed {
                script: script.to_path_buf(),
                message: last_line(&result.stderr)
                    .unwrap_or("import analysis failed")
                    .to_string(),
            });
        }
        let modules: BTreeMap<String, AnalyzedModule> =
            parse_reply(&result.stdout).map_err(|e| DepprovError::DiscoveryFailed {
                script: script.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(count = modules.len(), "modules found by analyzer");
        Ok(modules)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LocateReply {
    Path(PathBuf),
    Error(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ImportReply {
    Module(ModuleSnapshot),
    Error(String),
}

#[derive(Debug, Deserialize)]
struct ModuleSnapshot {
    name: String,
    file: Option<PathBuf>,
    package_root: Option<PathBuf>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum AttributeSnapshot {
    Null,
    Value { value: String },
    Callable,
    Module { module: ModuleSnapshot },
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

fn parse_reply<T: DeserializeOwned>(stdout: &str) -> anyhow::Result<T> {
    let line = last_line(stdout).ok_or_else(|| anyhow!("interpreter produced no output"))?;
    serde_json::from_str(line).with_context(|| format!("unexpected interpreter output: {line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn python() -> Option<PythonInterpreter> {
        let interpreter = PythonInterpreter::new("python3", Duration::from_secs(60));
        interpreter.environment().ok().map(|_| interpreter)
    }

    #[test]
    fn last_line_skips_trailing_blank_lines() {
        assert_eq!(last_line("noise\n{\"a\": 1}\n\n"), Some("{\"a\": 1}"));
        assert_eq!(last_line("   \n"), None);
    }

    #[test]
    fn parse_reply_reads_last_line_only() {
        let reply: LocateReply = parse_reply("warning: stray\n{\"path\": \"/lib/pkg\"}\n").unwrap();
        assert!(matches!(reply, LocateReply::Path(p) if p == Path::new("/lib/pkg")));
    }

    #[test]
    fn parse_reply_rejects_garbage() {
        assert!(parse_reply::<LocateReply>("not json").is_err());
        assert!(parse_reply::<LocateReply>("").is_err());
    }

    #[test]
    fn snapshot_maps_attribute_kinds() {
        let json = r#"{"module": {"name": "pkg", "file": "/site/pkg/__init__.py",
            "package_root": "/site/pkg", "attributes": {
                "__version__": {"kind": "value", "value": "1.2"},
                "VERSION": {"kind": "null"},
                "get_version": {"kind": "callable"},
                "version": {"kind": "module", "module": {"name": "pkg.version",
                    "file": null, "package_root": null,
                    "attributes": {"__version__": {"kind": "value", "value": "9"}}}}
            }}}"#;
        let ImportReply::Module(snapshot) = parse_reply::<ImportReply>(json).unwrap() else {
            panic!("expected module reply");
        };
        let interpreter = PythonInterpreter::new("python3", Duration::from_secs(1));

        let module = interpreter.snapshot_to_module("pkg", "", snapshot);

        assert_eq!(module.package_root, Some(PathBuf::from("/site/pkg")));
        assert!(matches!(module.attribute("__version__"), Some(Attribute::Value(v)) if v == "1.2"));
        assert!(matches!(module.attribute("VERSION"), Some(Attribute::Null)));
        assert!(matches!(module.attribute("get_version"), Some(Attribute::Callable(_))));
        match module.attribute("version") {
            Some(Attribute::Module(nested)) => {
                assert_eq!(nested.name, "pkg.version");
                assert!(
                    matches!(nested.attribute("__version__"), Some(Attribute::Value(v)) if v == "9")
                );
            }
            other => panic!("expected nested module, got {other:?}"),
        }
    }

    #[test]
    fn import_error_reply_is_captured() {
        let reply: ImportReply =
            parse_reply(r#"{"error": "ModuleNotFoundError: No module named 'dep'"}"#).unwrap();
        assert!(matches!(reply, ImportReply::Error(m) if m.contains("No module named")));
    }

    // The remaining tests drive a real interpreter and are skipped when
    // `python3` is not on PATH.

    #[test]
    fn environment_reports_stdlib_root() {
        let Some(python) = python() else { return };
        let env = python.environment().unwrap();

        assert!(env.stdlib.join("os.py").exists());
        assert!(env.version.starts_with('3'));
    }

    #[test]
    fn locate_stdlib_package_is_directly_under_stdlib_root() {
        let Some(python) = python() else { return };
        let env = python.environment().unwrap();

        let path = python.locate("json").unwrap();

        assert_eq!(path.parent(), Some(env.stdlib.as_path()));
    }

    #[test]
    fn locate_missing_module_fails_lookup() {
        let Some(python) = python() else { return };
        let err = python.locate("depprov_no_such_module_xyz").unwrap_err();
        assert!(matches!(err, DepprovError::LookupFailed { .. }));
    }

    #[test]
    fn import_and_call_version_attributes() {
        let Some(python) = python() else { return };
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("vpkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("__init__.py"),
            "print('noise on import')\n__version__ = (1, 2)\ndef get_version():\n    return '4.5'\n",
        )
        .unwrap();
        let python = python.with_extra_path(vec![temp.path().to_path_buf()]);

        let module = python.import("vpkg").unwrap();

        assert!(module.package_root.as_ref().unwrap().ends_with("vpkg"));
        assert!(matches!(module.attribute("__version__"), Some(Attribute::Value(v)) if v == "(1, 2)"));
        match module.attribute("get_version") {
            Some(Attribute::Callable(callable)) => {
                assert_eq!(callable.call().unwrap(), Some("4.5".to_string()));
            }
            other => panic!("expected callable, got {other:?}"),
        }
    }

    #[test]
    fn import_failure_is_reported_not_raised() {
        let Some(python) = python() else { return };
        let err = python.import("depprov_no_such_module_xyz").unwrap_err();
        assert_eq!(err.module, "depprov_no_such_module_xyz");
        assert!(err.message.contains("ModuleNotFoundError"));
    }

    #[test]
    fn analyze_lists_imported_packages() {
        let Some(python) = python() else { return };
        let env = python.environment().unwrap();
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("main.py");
        fs::write(&script, "import json\nimport os\nprint('hi')\n").unwrap();

        let modules = python.analyze(&script, &env.sys_path).unwrap();

        assert!(modules["json"].is_package);
        assert!(!modules["os"].is_package);
    }

    #[test]
    fn analyze_syntax_error_fails_discovery() {
        let Some(python) = python() else { return };
        let env = python.environment().unwrap();
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("broken.py");
        fs::write(&script, "def (:\n").unwrap();

        let err = python.analyze(&script, &env.sys_path).unwrap_err();
        assert!(matches!(err, DepprovError::DiscoveryFailed { .. }));
    }
}
