use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::paths::resolve_home_dir;

/// Environment overrides: `INTERFY__SERVER__PORT=9000` sets `server.port`.
const ENV_PREFIX: &str = "INTERFY__";
const HOME_SUBDIR: &str = ".interfy";

/// Raw per-module sections, keyed by module name.
pub type ModuleBag = HashMap<String, serde_json::Value>;

/// Top-level Interfy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// `None` when the file has no `logging` section; callers fall back to
    /// console-only defaults.
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Untyped until a module asks for its section via [`AppConfig::module_config`].
    #[serde(default)]
    pub modules: ModuleBag,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Absolute after loading; empty means `$HOME/.interfy`.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    /// Whole-request deadline in seconds. Zero turns it off.
    #[serde(default)]
    pub timeout_sec: u64,
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".into(),
            port: 8087,
            timeout_sec: 0,
            cors_enabled: false,
        }
    }
}

/// Subsystem name → sink settings. `default` catches every other target.
pub type LoggingConfig = HashMap<String, Section>;

/// Sinks for one logging subsystem.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    /// trace | debug | info | warn | error | off
    pub console_level: String,
    /// Relative to `home_dir`; empty keeps this subsystem off disk.
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        "default".to_string(),
        Section {
            console_level: "info".into(),
            file: "logs/interfy.log".into(),
            file_level: "debug".into(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: ModuleBag::new(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file, then `INTERFY__*` variables. The home
    /// directory is resolved and created, and `modules_dir` files are merged
    /// over inline module sections.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // logging stays None unless the file or environment sets it
        let layers = Figment::from(Serialized::defaults(AppConfig {
            logging: None,
            ..AppConfig::default()
        }))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: AppConfig = layers
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        config.resolve_home().context("Failed to resolve server.home_dir")?;
        if let Some(dir) = config.modules_dir.as_deref() {
            let files = read_module_dir(Path::new(dir))?;
            config.modules.extend(files);
        }
        Ok(config)
    }

    /// `load_layered` when a path is given, otherwise defaults with a resolved home.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_layered(path);
        }
        let mut config = Self::default();
        config
            .resolve_home()
            .context("Failed to resolve server.home_dir (defaults)")?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Typed view of one module's section; a missing section yields `T::default()`.
    pub fn module_config<T>(&self, module_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.modules.get(module_name) else {
            return Ok(T::default());
        };
        T::deserialize(raw)
            .with_context(|| format!("Invalid configuration for module '{module_name}'"))
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(level) = console_level_for(args.verbose) {
            let logging = self.logging.get_or_insert_with(default_logging_config);
            if let Some(section) = logging.get_mut("default") {
                section.console_level = level.into();
            }
        }
    }

    fn resolve_home(&mut self) -> Result<()> {
        let configured = Some(self.server.home_dir.trim())
            .filter(|dir| !dir.is_empty())
            .map(str::to_owned);
        let home = resolve_home_dir(configured, HOME_SUBDIR, true)?;
        self.server.home_dir = home.to_string_lossy().into_owned();
        Ok(())
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
}

/// `-v` raises the console to debug, `-vv` and beyond to trace.
fn console_level_for(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

fn is_module_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// One section per `<module>.yaml` file; a missing directory is empty.
fn read_module_dir(dir: &Path) -> Result<ModuleBag> {
    let mut bag = ModuleBag::new();
    if !dir.is_dir() {
        return Ok(bag);
    }
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list modules_dir {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !is_module_file(&path) {
            continue;
        }
        let Some(module) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read module config {}", path.display()))?;
        let section: serde_json::Value = serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        bag.insert(module.to_owned(), section);
    }
    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Writes `body` below a `server` block pointing at a fresh home dir.
    fn write_config(tmp: &TempDir, body: &str) -> PathBuf {
        let home = tmp.path().join("home").to_string_lossy().replace('\\', "/");
        let path = tmp.path().join("interfy.yaml");
        fs::write(
            &path,
            format!("server:\n  home_dir: \"{home}\"\n  host: 127.0.0.1\n  port: 8087\n{body}"),
        )
        .unwrap();
        path
    }

    #[test]
    fn defaults_target_local_development() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8087);
        assert!(!config.server.cors_enabled);
        assert_eq!(config.server.timeout_sec, 0);
        let section = &config.logging.as_ref().unwrap()["default"];
        assert_eq!(section.file, "logs/interfy.log");
        assert_eq!(section.max_backups, Some(3));
    }

    #[test]
    fn file_layer_sets_server_and_module_sections() {
        let tmp = tempdir().unwrap();
        let path = write_config(
            &tmp,
            "  cors_enabled: true\n  timeout_sec: 15\nmodules:\n  interviews:\n    max_text_length: 64\n",
        );
        let config = AppConfig::load_layered(&path).unwrap();

        let home = PathBuf::from(&config.server.home_dir);
        assert!(home.is_absolute() && home.is_dir());
        assert!(config.server.cors_enabled);
        assert_eq!(config.server.timeout_sec, 15);
        assert!(config.logging.is_none());
        assert_eq!(config.modules["interviews"]["max_text_length"], 64);
    }

    #[test]
    fn missing_file_names_the_path() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn unknown_server_key_fails_to_load() {
        let tmp = tempdir().unwrap();
        let path = write_config(&tmp, "  tls: true\n");

        let err = AppConfig::load_layered(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load config"));
    }

    #[test]
    fn verbosity_only_touches_the_console_level() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (4, "trace")] {
            let mut config = AppConfig {
                logging: None,
                ..AppConfig::default()
            };
            config.apply_cli_overrides(&CliArgs {
                verbose,
                ..CliArgs::default()
            });

            assert_eq!(config.server.port, 8087);
            match (&config.logging, verbose) {
                (None, 0) => {}
                (Some(logging), _) => assert_eq!(logging["default"].console_level, expected),
                (None, _) => panic!("-v must install a logging section"),
            }
        }
    }

    #[test]
    fn module_files_override_inline_sections() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("modules.d");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("interviews.YML"), "max_text_length: 42\n").unwrap();
        fs::write(dir.join("README.txt"), "not a module").unwrap();

        let dir_str = dir.to_string_lossy().replace('\\', "/");
        let path = write_config(
            &tmp,
            &format!(
                "modules_dir: \"{dir_str}\"\nmodules:\n  interviews:\n    max_text_length: 7\n"
            ),
        );

        let config = AppConfig::load_layered(&path).unwrap();
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules["interviews"]["max_text_length"], 42);
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct UploadLimits {
        #[serde(default)]
        max_upload_bytes: u64,
    }

    #[test]
    fn module_config_is_typed_and_defaulted() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.module_config::<UploadLimits>("uploads").unwrap(),
            UploadLimits::default()
        );

        config
            .modules
            .insert("uploads".into(), serde_json::json!({ "max_upload_bytes": 1024 }));
        assert_eq!(
            config.module_config::<UploadLimits>("uploads").unwrap().max_upload_bytes,
            1024
        );

        config
            .modules
            .insert("uploads".into(), serde_json::json!({ "max_upload_mb": 1 }));
        let err = config.module_config::<UploadLimits>("uploads").unwrap_err();
        assert!(err.to_string().contains("'uploads'"));
    }

    #[test]
    fn printed_config_loads_back() {
        let mut config = AppConfig::default();
        config.server.cors_enabled = true;

        let yaml = config.to_yaml().unwrap();
        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();

        assert!(parsed.server.cors_enabled);
        assert_eq!(parsed.logging.unwrap().len(), 1);
    }
}
