use std::env;
use std::path::PathBuf;
use tsgen_codegen::{GeneratorConfig, Nullability, TypeScriptGenerator, TypeTransformer};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let mut generator = TypeScriptGenerator::with_config(GeneratorConfig::from_env());

    generator
        .add_transformer(TypeTransformer::for_type(
            "uuid::Uuid",
            "string",
            Nullability::Inherit,
        ))
        .add_file_pre_processor(|_| {
            Some("// Types served by tsgen-example. Do not edit.\n".to_string())
        });

    // Automatically extract all types annotated with #[derive(TypeScript)]
    generator
        .add_source_dir(manifest_dir.join("src"))
        .expect("Failed to parse sources");

    // Write to OUT_DIR (standard cargo location)
    generator
        .write_to_file(out_dir.join("types.d.ts"))
        .expect("Failed to write declarations");

    // Also write to a more accessible location during development
    let dev_declarations = manifest_dir.join("generated/types.d.ts");
    if let Some(parent) = dev_declarations.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    generator.write_to_file(&dev_declarations).ok();

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=build.rs");
    for var in [
        "TSGEN_MODULE",
        "TSGEN_MODULE_KIND",
        "TSGEN_INDENT",
        "TSGEN_OUTPUT_DIR",
        "TSGEN_FILENAME",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
