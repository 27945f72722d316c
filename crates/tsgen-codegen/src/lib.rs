//! # tsgen-codegen
//!
//! TypeScript declaration generator for Rust data types. Annotated structs and
//! enums, plus every type they reach, are written out as TypeScript interfaces
//! and enums so a JavaScript client can describe the JSON a Rust service sends.
//!
//! ## Features
//!
//! - Source file parsing to extract types annotated with `#[derive(TypeScript)]`
//! - Transitive discovery: field, bound and supertype types are generated too
//! - Full `use` import resolution and type alias expansion
//! - `serde` renames, skips and flattening are honored
//! - Collection classification through marker traits ([`collections`])
//! - Custom type rules and definition/file hooks
//!
//! ## Quick Start
//!
//! ### Using `TypeScriptGenerator` directly
//!
//! ```rust
//! # fn main() -> Result<(), tsgen_codegen::Error> {
//! use tsgen_codegen::TypeScriptGenerator;
//! use tsgen_codegen::host::{Member, TypeDecl, TypeRef};
//!
//! let mut generator = TypeScriptGenerator::new();
//!
//! generator
//!     .register_type(TypeDecl::structure(
//!         "crate::Person",
//!         vec![
//!             Member::new("name", TypeRef::string()),
//!             Member::new("age", TypeRef::simple("u32")),
//!             Member::new("email", TypeRef::string().with_nullable(true)),
//!         ],
//!     ))
//!     .add_root("crate::Person");
//!
//! let code = generator.generate()?;
//! assert!(code.contains("email?: string;"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom type rules
//!
//! ```
//! use tsgen_codegen::{Nullability, TypeScriptGenerator, TypeTransformer};
//!
//! let mut generator = TypeScriptGenerator::new();
//!
//! // Serialize timestamps as ISO strings
//! generator.add_transformer(TypeTransformer::for_type(
//!     "chrono::DateTime",
//!     "string",
//!     Nullability::Inherit,
//! ));
//! ```
//!
//! ### Using `#[derive(TypeScript)]` macro
//!
//! ```rust,ignore
//! use tsgen_codegen::TypeScript;
//!
//! #[derive(TypeScript)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//! ```
//!
//! Then in `build.rs`:
//!
//! ```no_run
//! use tsgen_codegen::TypeScriptGenerator;
//!
//! fn main() {
//!     TypeScriptGenerator::new()
//!         .add_source_file("src/lib.rs").unwrap()
//!         .write_to_file("generated/types.d.ts").unwrap();
//!
//!     println!("cargo:rerun-if-changed=src/lib.rs");
//! }
//! ```
//!
//! ## Type Mappings
//!
//! | Rust Type | TypeScript Type |
//! |-----------|-----------------|
//! | `u8`-`u128`, `i8`-`i128`, `f32`, `f64` | `number` |
//! | `bool` | `boolean` |
//! | `char`, `String`, `&str` | `string` |
//! | `()` | `null` |
//! | `Option<T>` | optional property `T` |
//! | `Box<T>`, `Rc<T>`, `Arc<T>`, `Cow<T>` | `T` |
//! | `Vec<T>`, `[T; N]`, `VecDeque<T>` | `Array<T>` |
//! | `HashMap<String, V>` | `{ [key: string]: V }` |
//! | `HashMap<u32, V>` | `{ [key: number]: V }` |
//! | `HashMap<K, V>` | `Map<K, V>` |
//! | `HashSet<T>`, `BTreeSet<T>` | `Set<T>` |
//! | `(A, B)` | `[A, B]` |
//! | Generated types | their name |
//! | Anything else | `any /* unknown type */` |

pub mod classify;
mod config;
pub mod context;
mod error;
mod extractor;
mod generator;
pub mod host;
pub mod resolver;
pub mod target;
pub mod transform;
pub mod wrapped;

pub use config::{GeneratorConfig, ModuleOption};
pub use error::{Diagnostic, Error, Rejection, Severity, StructuralError};
pub use generator::{DefinitionProcessor, FileProcessor, FileScope, Resolution, TypeScriptGenerator};
pub use host::{HostModel, TypeOracle};
pub use transform::{Nullability, TypeTransformer};

#[cfg(feature = "derive")]
pub use tsgen_derive::TypeScript;

/// Marker traits for collection-like types.
///
/// Implement one of these for your own container and the generator emits it
/// the way it emits the standard collections.
///
/// ```
/// use tsgen_codegen::collections::Map;
///
/// struct Registry<K, V> {
///     entries: Vec<(K, V)>,
/// }
///
/// impl<K, V> Map<K, V> for Registry<K, V> {}
/// ```
pub mod collections {
    /// Emitted as an index signature or `Map<K, V>`.
    pub trait Map<K, V> {}

    /// Emitted as `Set<T>`.
    pub trait Set<T> {}

    /// Emitted as `Array<T>`.
    pub trait Collection<T> {}
}
