//! Schema Form CLI
//!
//! Command-line interface for the form state pipeline: resolve a schema,
//! compute defaults, build field identities, validate data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_form::{
    build_identity, compute_defaults, extract_paths, format_path, load_document, resolve,
    run_validation, ArrayMinItems, ConstAsDefaults, DefaultsPolicy, EmptyObjectFields,
    JsonSchemaValidator,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Resolve schemas, compute defaults, and validate form data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema's references, dependencies, and conditionals
    Resolve {
        /// Schema file to resolve
        schema: PathBuf,

        /// Form data file steering branch selection
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compute default form data for a schema
    Defaults {
        /// Schema file to compute defaults for
        schema: PathBuf,

        /// Existing form data file to layer over the defaults
        #[arg(long)]
        data: Option<PathBuf>,

        /// minItems policy: all, required-only, never
        #[arg(long, default_value = "all")]
        array_min_items: String,

        /// Object population policy: populate-all, populate-required,
        /// skip-defaults, skip-empty
        #[arg(long, default_value = "populate-all")]
        empty_object_fields: String,

        /// const seeding policy: always, skip-one-of, never
        #[arg(long, default_value = "always")]
        const_as_defaults: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Build the field identity tree for a schema
    Fields {
        /// Schema file to build identities for
        schema: PathBuf,

        /// Form data file driving dynamic and array fields
        #[arg(long)]
        data: Option<PathBuf>,

        /// Identifier given to the root field
        #[arg(long, default_value = "root")]
        id_prefix: String,

        /// Separator between identifier segments
        #[arg(long, default_value = "_")]
        id_separator: String,

        /// Print addressable data paths instead of the identity tree
        #[arg(long)]
        paths: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate form data against a schema
    Validate {
        /// Schema file to validate against
        schema: PathBuf,

        /// Form data file to validate
        data: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Suppress output, report through the exit code only
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            schema,
            data,
            output,
            pretty,
        } => run_resolve(&schema, data.as_deref(), output, pretty),

        Commands::Defaults {
            schema,
            data,
            array_min_items,
            empty_object_fields,
            const_as_defaults,
            output,
            pretty,
        } => run_defaults(
            &schema,
            data.as_deref(),
            &array_min_items,
            &empty_object_fields,
            &const_as_defaults,
            output,
            pretty,
        ),

        Commands::Fields {
            schema,
            data,
            id_prefix,
            id_separator,
            paths,
            pretty,
        } => run_fields(&schema, data.as_deref(), &id_prefix, &id_separator, paths, pretty),

        Commands::Validate {
            schema,
            data,
            json,
            quiet,
        } => run_validate(&schema, &data, json, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_resolve(
    schema_path: &Path,
    data_path: Option<&Path>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let schema = load_json(schema_path)?;
    let data = load_optional(data_path)?;

    let resolved = resolve(&schema, &schema, data.as_ref()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&resolved, output, pretty)
}

fn run_defaults(
    schema_path: &Path,
    data_path: Option<&Path>,
    array_min_items: &str,
    empty_object_fields: &str,
    const_as_defaults: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let policy = DefaultsPolicy {
        array_min_items: ArrayMinItems::parse(array_min_items).ok_or_else(|| {
            eprintln!("Error: unknown array-min-items value: {}", array_min_items);
            2u8
        })?,
        empty_object_fields: EmptyObjectFields::parse(empty_object_fields).ok_or_else(|| {
            eprintln!(
                "Error: unknown empty-object-fields value: {}",
                empty_object_fields
            );
            2u8
        })?,
        const_as_defaults: ConstAsDefaults::parse(const_as_defaults).ok_or_else(|| {
            eprintln!("Error: unknown const-as-defaults value: {}", const_as_defaults);
            2u8
        })?,
    };

    let schema = load_json(schema_path)?;
    let data = load_optional(data_path)?;

    let defaults = compute_defaults(&schema, &schema, data.as_ref(), &policy);
    write_output(&defaults.unwrap_or(Value::Null), output, pretty)
}

fn run_fields(
    schema_path: &Path,
    data_path: Option<&Path>,
    id_prefix: &str,
    id_separator: &str,
    paths: bool,
    pretty: bool,
) -> Result<(), u8> {
    let schema = load_json(schema_path)?;
    let data = load_optional(data_path)?;

    let identity = build_identity(&schema, &schema, None, data.as_ref(), id_prefix, id_separator)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    if paths {
        for path in extract_paths(&identity, data.as_ref()) {
            println!("{}", format_path(&path));
        }
        return Ok(());
    }

    let tree = serde_json::to_value(&identity).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_output(&tree, None, pretty)
}

fn run_validate(schema_path: &Path, data_path: &Path, json: bool, quiet: bool) -> Result<(), u8> {
    let schema = load_json(schema_path)?;
    let data = load_json(data_path)?;

    let outcome = run_validation(&JsonSchemaValidator, &schema, Some(&data), None);
    if outcome.is_valid() {
        if json {
            println!(r#"{{"valid":true}}"#);
        } else if !quiet {
            println!("Valid");
        }
        return Ok(());
    }

    if json {
        let output = serde_json::json!({
            "valid": false,
            "errors": outcome.errors,
            "error_tree": outcome.error_tree.to_value(),
        });
        println!("{}", output);
    } else if !quiet {
        eprintln!("Validation failed:");
        for error in &outcome.errors {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

/// Load a JSON document, reporting failures on stderr.
fn load_json(path: &Path) -> Result<Value, u8> {
    load_document(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_optional(path: Option<&Path>) -> Result<Option<Value>, u8> {
    match path {
        Some(path) => load_json(path).map(Some),
        None => Ok(None),
    }
}

/// Serialize `value` and write it to the output target.
fn write_output(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
