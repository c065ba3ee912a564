use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use openapi_polymorph_core::{
    build_openapi, generate, map_modules, EnvelopeOptions, GenerateOptions, ModuleRewrite,
    TypeRegistry,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "openapi-polymorph")]
#[command(about = "Compile a type registry into polymorphic OpenAPI component schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an OpenAPI document (or bare schemas) from a type registry
    Generate {
        /// Input type registry file
        input: PathBuf,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Root type names (defaults to the registry's roots, then every type)
        #[arg(long = "root", value_name = "NAME")]
        roots: Vec<String>,

        /// Extra ancestor names that stop chain discovery
        #[arg(long = "sentinel", value_name = "NAME")]
        sentinels: Vec<String>,

        /// Keep schemas flat instead of composing them over their ancestors
        #[arg(long)]
        no_inheritance: bool,

        /// Do not add a discriminator to compositions
        #[arg(long)]
        no_discriminator: bool,

        /// Do not synthesize the `type` identity property
        #[arg(long)]
        no_identity_field: bool,

        /// Do not default numeric formats (double / int32)
        #[arg(long)]
        no_default_formats: bool,

        /// Do not emit display tags for enums
        #[arg(long)]
        no_enum_tags: bool,

        /// API title for the envelope
        #[arg(long)]
        title: Option<String>,

        /// API version for the envelope (required unless --schemas-only)
        #[arg(long = "version", value_name = "VERSION")]
        api_version: Option<String>,

        /// API description for the envelope
        #[arg(long)]
        description: Option<String>,

        /// URL of external documentation linked from the envelope
        #[arg(long, value_name = "URL")]
        external_docs_url: Option<String>,

        /// Description of the external documentation link
        #[arg(long, value_name = "TEXT", requires = "external_docs_url")]
        external_docs_description: Option<String>,

        /// Write only the schema map, without the OpenAPI envelope
        #[arg(long)]
        schemas_only: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,

        /// Write the diagnostics reported during generation to this file
        #[arg(long)]
        diagnostics: Option<PathBuf>,
    },

    /// Map every reachable type to its owning module
    Modules {
        /// Input type registry file
        input: PathBuf,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Root type names (defaults to the registry's roots, then every type)
        #[arg(long = "root", value_name = "NAME")]
        roots: Vec<String>,

        /// Literal find/replace applied to every module path
        #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
        replace: Option<Vec<String>>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            input,
            output,
            roots,
            sentinels,
            no_inheritance,
            no_discriminator,
            no_identity_field,
            no_default_formats,
            no_enum_tags,
            title,
            api_version,
            description,
            external_docs_url,
            external_docs_description,
            schemas_only,
            format,
            diagnostics,
        } => {
            let registry = read_registry(&input)?;

            let mut options = GenerateOptions {
                enable_inheritance: !no_inheritance,
                add_discriminator: !no_discriminator,
                add_identity_field: !no_identity_field,
                add_default_formats: !no_default_formats,
                tag_enums: !no_enum_tags,
                ..GenerateOptions::default()
            };
            options.sentinels.extend(sentinels);

            let result = generate(&registry, &roots, &options)
                .map_err(|e| anyhow::Error::from(e).context("Generation failed"))?;

            if let Some(path) = diagnostics {
                write_json(&result.diagnostics, Some(&path), format)?;
            }

            if schemas_only {
                write_json(&result.schemas, output.as_ref(), format)?;
            } else {
                let envelope = EnvelopeOptions {
                    title,
                    version: api_version,
                    description,
                    external_docs: external_docs_url.map(|url| {
                        let mut docs = serde_json::json!({ "url": url });
                        if let Some(text) = external_docs_description {
                            docs["description"] = serde_json::Value::String(text);
                        }
                        docs
                    }),
                };
                let document = build_openapi(result, envelope).map_err(|e| {
                    anyhow::Error::from(e).context("Failed to build OpenAPI document")
                })?;
                write_json(&document, output.as_ref(), format)?;
            }
        }
        Commands::Modules {
            input,
            output,
            roots,
            replace,
            format,
        } => {
            let registry = read_registry(&input)?;
            let rewrite = match replace.as_deref() {
                Some([find, to]) => Some(ModuleRewrite::new(find.as_str(), to.as_str())),
                _ => None,
            };

            let options = GenerateOptions::default();
            let modules = map_modules(&registry, &roots, &options, rewrite.as_ref())
                .map_err(|e| anyhow::Error::from(e).context("Module mapping failed"))?;

            write_json(&modules, output.as_ref(), format)?;
        }
    }

    Ok(())
}

fn read_registry(input: &Path) -> Result<TypeRegistry> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open registry file: {}", input.display()))?;
    let reader = BufReader::new(file);
    TypeRegistry::from_reader(reader)
        .with_context(|| format!("Failed to load registry from: {}", input.display()))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
