//! Proc-macro providing the `#[derive(TypeScript)]` attribute.
//!
//! This macro is a **no-op annotation** - it doesn't generate any code.
//! It marks a type as a root for TypeScript declaration generation via
//! `tsgen-codegen` in your build.rs, and registers the `#[ts(...)]` helper
//! attribute so field and container options compile.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde::Serialize;
//! use tsgen_codegen::TypeScript;
//!
//! #[derive(Serialize, TypeScript)]
//! #[ts(extends = "Audit")]
//! struct Person {
//!     name: String,
//!     #[ts(tag = "timestamp")]
//!     born: u64,
//!     #[ts(skip)]
//!     cache: Vec<u8>,
//! }
//! ```
//!
//! Then in your build.rs:
//!
//! ```rust,ignore
//! use tsgen_codegen::TypeScriptGenerator;
//!
//! fn main() {
//!     TypeScriptGenerator::new()
//!         .add_source_dir("src").unwrap()
//!         .write_to_file("types.d.ts").unwrap();
//! }
//! ```

use proc_macro::TokenStream;

/// Marker derive macro for TypeScript declaration generation.
///
/// This macro is a no-op - it doesn't generate any code at compile time.
/// Supported helper options:
///
/// - `#[ts(rename = "...")]` and `#[ts(skip)]` on fields and variants
/// - `#[ts(tag = "...")]` on fields, for custom type rules
/// - `#[ts(extends = "Type<Args>")]` and `#[ts(rename_all = "...")]` on the type
#[proc_macro_derive(TypeScript, attributes(ts))]
pub fn derive_typescript(_input: TokenStream) -> TokenStream {
    TokenStream::new()
}
