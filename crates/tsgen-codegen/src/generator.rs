//! TypeScript declaration generator.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::{GeneratorConfig, ModuleOption};
use crate::context::TargetContext;
use crate::error::{Diagnostic, Error, StructuralError};
use crate::host::{self, HostModel, QualifiedName, Supertype, TypeDecl};
use crate::resolver;
use crate::target::{TargetKind, TargetMember, TargetType};
use crate::transform::{TypeScriptTransformer, TypeTransformer};
use crate::wrapped::WrappedType;

/// Text injected before or after one definition.
pub type DefinitionProcessor = Box<dyn Fn(&TargetType) -> Option<String>>;
/// Text injected before or after the whole file.
pub type FileProcessor = Box<dyn Fn(&FileScope<'_>) -> Option<String>>;

type DefinitionName = Box<dyn Fn(&QualifiedName) -> String>;
type SupertypeName = Box<dyn Fn(&QualifiedName, &str) -> String>;

/// What file processors get to see.
#[derive(Debug)]
pub struct FileScope<'a> {
    pub target_types: &'a BTreeMap<String, TargetType>,
    /// Modules of the annotated roots.
    pub root_modules: BTreeSet<String>,
    /// Modules of every emitted type.
    pub modules: BTreeSet<String>,
}

/// The outcome of scope resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Target types keyed by simple name.
    pub types: BTreeMap<String, TargetType>,
    /// Warnings for discovered types that were dropped.
    pub diagnostics: Vec<Diagnostic>,
}

/// Generator that resolves annotated types and outputs TypeScript declarations.
///
/// # Host model
///
/// The generator owns a [`HostModel`] holding every declaration it knows
/// about. Source extraction ([`add_source_file`](Self::add_source_file) and
/// friends) fills it in; declarations can also be registered by hand with
/// [`register_type`](Self::register_type) and marked for generation with
/// [`add_root`](Self::add_root).
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), tsgen_codegen::Error> {
/// use tsgen_codegen::TypeScriptGenerator;
///
/// let mut generator = TypeScriptGenerator::new();
/// generator.set_timestamp("now").add_source_str(
///     r#"
///     use tsgen_codegen::TypeScript;
///
///     #[derive(TypeScript)]
///     struct Point { x: f64, y: f64, label: Option<String> }
///     "#,
/// );
///
/// let code = generator.generate()?;
/// assert!(code.contains("interface Point {"));
/// assert!(code.contains("label?: string;"));
/// # Ok(())
/// # }
/// ```
pub struct TypeScriptGenerator {
    config: GeneratorConfig,

    /// Declarations known to the generator.
    pub(crate) model: HostModel,
    /// `impl Trait for Type` blocks whose type has not been extracted yet.
    pub(crate) deferred_impls: Vec<(String, Supertype)>,

    transformer: TypeScriptTransformer,

    definition_pre: Vec<DefinitionProcessor>,
    definition_post: Vec<DefinitionProcessor>,
    file_pre: Vec<FileProcessor>,
    file_post: Vec<FileProcessor>,

    definition_name: DefinitionName,
    supertype_name: SupertypeName,
}

impl Default for TypeScriptGenerator {
    fn default() -> Self {
        Self::with_config(GeneratorConfig::default())
    }
}

impl fmt::Debug for TypeScriptGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeScriptGenerator")
            .field("config", &self.config)
            .field("model", &self.model)
            .field("transformer", &self.transformer)
            .field("definition_pre", &self.definition_pre.len())
            .field("definition_post", &self.definition_post.len())
            .field("file_pre", &self.file_pre.len())
            .field("file_post", &self.file_post.len())
            .finish_non_exhaustive()
    }
}

impl TypeScriptGenerator {
    /// Create a generator with default options and the built-in declarations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            model: HostModel::with_builtins(),
            deferred_impls: Vec::new(),
            transformer: TypeScriptTransformer::new(),
            definition_pre: Vec::new(),
            definition_post: Vec::new(),
            file_pre: Vec::new(),
            file_post: Vec::new(),
            definition_name: Box::new(|name| name.simple().to_string()),
            supertype_name: Box::new(|name, _module| name.simple().to_string()),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    /// Set the module or namespace name (default `NativeTypes`).
    pub fn set_module_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.module_name = name.into();
        self
    }

    pub fn set_module_option(&mut self, option: ModuleOption) -> &mut Self {
        self.config.module_option = option;
        self
    }

    pub fn set_indent(&mut self, indent: impl Into<String>) -> &mut Self {
        self.config.indent = indent.into();
        self
    }

    pub fn export_definitions(&mut self, enabled: bool) -> &mut Self {
        self.config.export_definitions = enabled;
        self
    }

    pub fn declare(&mut self, enabled: bool) -> &mut Self {
        self.config.declare = enabled;
        self
    }

    /// Only emit types whose module is, or is inside, the module of an annotated root.
    pub fn constrain_to_root_modules(&mut self, enabled: bool) -> &mut Self {
        self.config.constrain_to_root_modules = enabled;
        self
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.file_name = name.into();
        self
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Pin the text of the `/* generated @ ... */` comment.
    pub fn set_timestamp(&mut self, timestamp: impl Into<String>) -> &mut Self {
        self.config.timestamp = Some(timestamp.into());
        self
    }

    /// Add a custom type rule. Custom rules take precedence over every built-in rule.
    pub fn add_transformer(&mut self, transformer: TypeTransformer) -> &mut Self {
        self.transformer.add(transformer);
        self
    }

    pub fn add_definition_pre_processor(
        &mut self,
        processor: impl Fn(&TargetType) -> Option<String> + 'static,
    ) -> &mut Self {
        self.definition_pre.push(Box::new(processor));
        self
    }

    pub fn add_definition_post_processor(
        &mut self,
        processor: impl Fn(&TargetType) -> Option<String> + 'static,
    ) -> &mut Self {
        self.definition_post.push(Box::new(processor));
        self
    }

    pub fn add_file_pre_processor(
        &mut self,
        processor: impl Fn(&FileScope<'_>) -> Option<String> + 'static,
    ) -> &mut Self {
        self.file_pre.push(Box::new(processor));
        self
    }

    pub fn add_file_post_processor(
        &mut self,
        processor: impl Fn(&FileScope<'_>) -> Option<String> + 'static,
    ) -> &mut Self {
        self.file_post.push(Box::new(processor));
        self
    }

    /// Override how a definition is named. Defaults to the simple name.
    pub fn set_definition_name(
        &mut self,
        name: impl Fn(&QualifiedName) -> String + 'static,
    ) -> &mut Self {
        self.definition_name = Box::new(name);
        self
    }

    /// Override how a supertype is named in `extends` clauses. The hook gets
    /// the supertype and the configured module name.
    pub fn set_supertype_name(
        &mut self,
        name: impl Fn(&QualifiedName, &str) -> String + 'static,
    ) -> &mut Self {
        self.supertype_name = Box::new(name);
        self
    }

    /// Register a declaration in the host model.
    pub fn register_type(&mut self, decl: TypeDecl) -> &mut Self {
        self.model.register(decl);
        self
    }

    /// Remove a declaration from the host model.
    ///
    /// This can be used to disable a built-in declaration.
    pub fn unregister_type(&mut self, canonical: &str) -> &mut Self {
        self.model.unregister(canonical);
        self
    }

    /// Mark a registered declaration for generation.
    pub fn add_root(&mut self, canonical: impl Into<String>) -> &mut Self {
        self.model.mark_root(canonical);
        self
    }

    /// Get a reference to the host model.
    pub fn model(&self) -> &HostModel {
        &self.model
    }

    /// Resolve every root and the types they reach.
    ///
    /// Fails with every collected diagnostic when an annotated type cannot be
    /// generated.
    pub fn resolve(&self) -> Result<Resolution, Error> {
        let mut ctx = TargetContext::new(&self.model);
        let mut types = BTreeMap::new();
        for root in self.model.roots() {
            for target in resolver::resolve(root, &mut ctx) {
                types.insert(target.simple_name().to_string(), target);
            }
        }

        if ctx.has_errors() {
            return Err(Error::Rejected(ctx.into_diagnostics()));
        }
        Ok(Resolution {
            types,
            diagnostics: ctx.into_diagnostics(),
        })
    }

    /// Generate the TypeScript declarations as a string.
    pub fn generate(&self) -> Result<String, Error> {
        let Resolution { types, .. } = self.resolve()?;
        let scope: BTreeSet<String> = types.keys().cloned().collect();

        let root_modules: BTreeSet<String> = self
            .model
            .roots()
            .iter()
            .map(|root| module_of(&QualifiedName::new(root.as_str())))
            .collect();
        let emitted: BTreeMap<String, TargetType> = types
            .into_iter()
            .filter(|(_, target)| {
                !self.config.constrain_to_root_modules
                    || within(&module_of(&target.name), &root_modules)
            })
            .collect();
        let file_scope = FileScope {
            target_types: &emitted,
            modules: emitted.values().map(|t| module_of(&t.name)).collect(),
            root_modules,
        };

        let mut output = format!("/* generated @ {} */\n", self.config.timestamp());
        for processor in &self.file_pre {
            if let Some(text) = processor(&file_scope) {
                output.push_str(&text);
            }
        }

        output.push_str(&self.module_start());

        let mut definitions = Vec::new();
        for target in emitted.values() {
            let mut definition = String::new();
            for processor in &self.definition_pre {
                if let Some(text) = processor(target) {
                    definition.push_str(&text);
                }
            }
            let body = match target.kind {
                TargetKind::Interface => self.generate_interface(target, &scope)?,
                TargetKind::Enum => self.generate_enum(target),
            };
            definition.push_str(&body);
            for processor in &self.definition_post {
                if let Some(text) = processor(target) {
                    definition.push_str(&text);
                }
            }
            definitions.push(definition);
        }
        output.push_str(&definitions.concat());

        if self.config.module_option != ModuleOption::None {
            output.push_str("}\n");
        }
        for processor in &self.file_post {
            if let Some(text) = processor(&file_scope) {
                output.push_str(&text);
            }
        }

        tracing::debug!(definitions = emitted.len(), "generated TypeScript declarations");
        Ok(output)
    }

    fn module_start(&self) -> String {
        let export = if self.config.export_definitions { "export " } else { "" };
        let declare = if self.config.declare { "declare " } else { "" };
        let name = &self.config.module_name;
        match self.config.module_option {
            ModuleOption::Module => format!("{export}{declare}module \"{name}\" {{\n"),
            ModuleOption::Namespace => format!("{export}{declare}namespace {name} {{\n"),
            ModuleOption::None => String::new(),
        }
    }

    fn export(&self) -> &'static str {
        if self.config.export_definitions { "export " } else { "" }
    }

    fn generate_interface(
        &self,
        target: &TargetType,
        scope: &BTreeSet<String>,
    ) -> Result<String, StructuralError> {
        let base = self.config.base_indent();
        let indent = &self.config.indent;
        let vars = &target.type_variables;

        let mut header = format!(
            "{base}{}interface {}",
            self.export(),
            (self.definition_name)(&target.name)
        );
        if !vars.is_empty() {
            let params = vars
                .iter()
                .map(|(name, var)| self.type_parameter(name, var, scope, vars))
                .collect::<Result<Vec<_>, _>>()?;
            header.push_str(&format!("<{}>", params.join(", ")));
        }
        if !target.supertypes.is_empty() {
            let supers: Vec<_> = target
                .supertypes
                .iter()
                .map(|applied| {
                    let name = (self.supertype_name)(&applied.name, &self.config.module_name);
                    if applied.arguments.is_empty() {
                        return name;
                    }
                    let args: Vec<_> = applied
                        .arguments
                        .iter()
                        .map(|arg| self.transformer.transform(arg, scope, vars))
                        .collect();
                    format!("{name}<{}>", args.join(", "))
                })
                .collect();
            header.push_str(&format!(" extends {}", supers.join(", ")));
        }

        let mut code = format!("{header} {{\n");
        for member in target.members.values() {
            let TargetMember::Property(property) = member else {
                continue;
            };
            let optional = if self.transformer.is_nullable(&property.ty) { "?" } else { "" };
            let ty = self.transformer.transform(&property.ty, scope, vars);
            code.push_str(&format!(
                "{base}{indent}{}{optional}: {ty};\n",
                member.json_name()
            ));
        }
        code.push_str(&format!("{base}}}\n"));
        Ok(code)
    }

    fn type_parameter(
        &self,
        name: &str,
        var: &WrappedType,
        scope: &BTreeSet<String>,
        vars: &IndexMap<String, WrappedType>,
    ) -> Result<String, StructuralError> {
        let bounds: Vec<_> = var
            .bounds()?
            .values()
            .filter(|bound| bound.canonical_name() != Some(host::ANY))
            .map(|bound| self.transformer.transform(bound, scope, vars))
            .collect();
        if bounds.is_empty() {
            Ok(name.to_string())
        } else {
            Ok(format!("{name} extends {}", bounds.join(" & ")))
        }
    }

    fn generate_enum(&self, target: &TargetType) -> String {
        let base = self.config.base_indent();
        let indent = &self.config.indent;

        let mut values: Vec<_> = target.members.values().map(TargetMember::json_name).collect();
        values.sort();
        let body: Vec<_> = values
            .iter()
            .map(|value| format!("{base}{indent}{value} = '{value}'"))
            .collect();

        let mut code = format!(
            "{base}{}enum {} {{\n",
            self.export(),
            (self.definition_name)(&target.name)
        );
        if !body.is_empty() {
            code.push_str(&body.join(",\n"));
            code.push('\n');
        }
        code.push_str(&format!("{base}}}\n"));
        code
    }

    /// Write the generated declarations to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let code = self.generate()?;
        fs::write(path.as_ref(), code)?;
        tracing::info!(path = %path.as_ref().display(), "wrote TypeScript declarations");
        Ok(())
    }

    /// Write the generated declarations to a writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let code = self.generate()?;
        writer.write_all(code.as_bytes())?;
        Ok(())
    }

    /// Write `file_name` into the configured output directory, falling back
    /// to `OUT_DIR` and then the current directory. The directory must exist.
    pub fn write_to_output_dir(&self) -> Result<PathBuf, Error> {
        let dir = match &self.config.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        if !dir.is_dir() {
            return Err(Error::OutputDir(dir));
        }
        let path = dir.join(&self.config.file_name);
        self.write_to_file(&path)?;
        Ok(path)
    }
}

fn module_of(name: &QualifiedName) -> String {
    name.module().unwrap_or_default().to_string()
}

fn within(module: &str, roots: &BTreeSet<String>) -> bool {
    roots.iter().any(|root| {
        module == root
            || root.is_empty()
            || module
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.starts_with("::"))
    })
}
