use std::env;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// How generated definitions are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleOption {
    /// `declare module "Name" { ... }`
    #[default]
    Module,
    /// `declare namespace Name { ... }`
    Namespace,
    /// Top-level definitions without a wrapper.
    None,
}

impl ModuleOption {
    /// Parse `module`, `namespace` or `none`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "module" => Some(Self::Module),
            "namespace" => Some(Self::Namespace),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub module_name: String,
    pub module_option: ModuleOption,
    pub indent: String,
    /// Only emit types under the modules of the annotated roots.
    pub constrain_to_root_modules: bool,
    /// Prefix every definition (and the wrapper) with `export `.
    pub export_definitions: bool,
    /// Prefix the wrapper with `declare `.
    pub declare: bool,
    pub file_name: String,
    pub output_dir: Option<PathBuf>,
    /// Fixed text for the generation comment. Defaults to the current unix time.
    pub timestamp: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module_name: "NativeTypes".to_string(),
            module_option: ModuleOption::Module,
            indent: "  ".to_string(),
            constrain_to_root_modules: false,
            export_definitions: false,
            declare: true,
            file_name: "types.d.ts".to_string(),
            output_dir: None,
            timestamp: None,
        }
    }
}

impl GeneratorConfig {
    /// Defaults, overridden by `TSGEN_MODULE`, `TSGEN_MODULE_KIND`,
    /// `TSGEN_INDENT`, `TSGEN_OUTPUT_DIR` and `TSGEN_FILENAME`.
    ///
    /// `TSGEN_INDENT` is either a number of spaces or the literal indent.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(module) = env::var("TSGEN_MODULE") {
            config.module_name = module;
        }
        if let Ok(kind) = env::var("TSGEN_MODULE_KIND") {
            match ModuleOption::parse(&kind) {
                Some(option) => config.module_option = option,
                None => tracing::warn!("ignoring unknown TSGEN_MODULE_KIND `{kind}`"),
            }
        }
        if let Ok(indent) = env::var("TSGEN_INDENT") {
            config.indent = match indent.parse::<usize>() {
                Ok(width) => " ".repeat(width),
                Err(_) => indent.replace("\\t", "\t"),
            };
        }
        if let Ok(dir) = env::var("TSGEN_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(dir));
        }
        if let Ok(file_name) = env::var("TSGEN_FILENAME") {
            config.file_name = file_name;
        }
        config
    }

    pub fn timestamp(&self) -> String {
        match &self.timestamp {
            Some(fixed) => fixed.clone(),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs().to_string())
                .unwrap_or_else(|_| "0".to_string()),
        }
    }

    /// Indent of a definition inside the wrapper.
    pub fn base_indent(&self) -> &str {
        match self.module_option {
            ModuleOption::None => "",
            ModuleOption::Module | ModuleOption::Namespace => &self.indent,
        }
    }
}
