// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rae_cli::commands::{
    FaultSpec, SchemaKind, config_check, decode_to_json, load_mapper, parse_headers,
    render_mapped, schema_json,
};
use rae_model::WireFormat;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rae", version, about = "REST API error mapping CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map a fault to the error response a service would send.
    Map {
        /// Mapper configuration (TOML). Built-in rules when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fault kind chain, most specific first. Can be repeated.
        #[arg(long = "kind", required = true)]
        kinds: Vec<String>,

        /// Message of the fault.
        #[arg(long)]
        message: Option<String>,

        /// Status declared by the fault itself.
        #[arg(long)]
        status: Option<u16>,

        /// Error code declared by the fault itself.
        #[arg(long)]
        code: Option<String>,

        /// Status declared on the fault's kind.
        #[arg(long)]
        annotation_status: Option<u16>,

        /// Reason accompanying --annotation-status.
        #[arg(long, requires = "annotation_status")]
        annotation_reason: Option<String>,

        /// Stack frame, innermost first. Can be repeated.
        #[arg(long = "frame")]
        frames: Vec<String>,

        /// Request path that failed.
        #[arg(long, default_value = "/")]
        path: String,

        /// Identifier of the failing request handler.
        #[arg(long)]
        handler: Option<String>,

        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// Print the status line and headers before the body.
        #[arg(short = 'i', long)]
        include_headers: bool,
    },

    /// Decode an error response body into the error a client would see.
    Decode {
        /// HTTP status of the response.
        #[arg(long)]
        status: u16,

        /// Content type of the body.
        #[arg(long)]
        content_type: Option<String>,

        /// Additional response header as 'name: value'. Can be repeated.
        #[arg(long = "header")]
        headers: Vec<String>,

        /// Label of the failed request.
        #[arg(long, default_value = "cli")]
        label: String,

        /// File holding the body; '-' reads standard input.
        body: PathBuf,
    },

    /// Validate a mapper configuration file.
    CheckConfig {
        /// Path to the TOML file.
        config: PathBuf,
    },

    /// Print a JSON schema.
    Schema {
        #[arg(value_enum, default_value_t = SchemaArg::Config)]
        kind: SchemaArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Xml,
}

impl From<FormatArg> for WireFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Json => WireFormat::Json,
            FormatArg::Xml => WireFormat::Xml,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaArg {
    Config,
    Model,
}

impl From<SchemaArg> for SchemaKind {
    fn from(v: SchemaArg) -> Self {
        match v {
            SchemaArg::Config => SchemaKind::Config,
            SchemaArg::Model => SchemaKind::Model,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("rae=debug")
    } else {
        EnvFilter::new("rae=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Map {
            config,
            kinds,
            message,
            status,
            code,
            annotation_status,
            annotation_reason,
            frames,
            path,
            handler,
            format,
            include_headers,
        } => {
            let spec = FaultSpec {
                kinds,
                message,
                status,
                code,
                annotation_status,
                annotation_reason,
                frames,
            };
            cmd_map(config, &spec, &path, handler.as_deref(), format.into(), include_headers)
        }
        Commands::Decode {
            status,
            content_type,
            headers,
            label,
            body,
        } => cmd_decode(status, content_type, &headers, &label, &body),
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::Schema { kind } => {
            println!("{}", schema_json(kind.into())?);
            Ok(())
        }
    }
}

fn cmd_map(
    config: Option<PathBuf>,
    spec: &FaultSpec,
    path: &str,
    handler: Option<&str>,
    format: WireFormat,
    include_headers: bool,
) -> Result<()> {
    let mapper = load_mapper(config.as_deref())?;
    if !mapper.is_applicable(path) {
        tracing::info!(target: "rae.cli", path, "path is not an api path; mapping anyway");
    }
    let fault = spec.to_fault()?;
    let mapped = mapper.build_response(&fault, path, handler);
    println!("{}", render_mapped(&mapped, format, include_headers)?);
    Ok(())
}

fn cmd_decode(
    status: u16,
    content_type: Option<String>,
    headers: &[String],
    label: &str,
    body: &Path,
) -> Result<()> {
    let mut raw = headers.to_vec();
    if let Some(ct) = content_type {
        raw.push(format!("content-type: {ct}"));
    }
    let headers = parse_headers(&raw)?;

    let bytes = if body.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("read body from stdin")?;
        buf
    } else {
        std::fs::read(body).with_context(|| format!("read body file '{}'", body.display()))?
    };

    println!("{}", decode_to_json(label, status, &headers, &bytes)?);
    Ok(())
}

fn cmd_check_config(config: &Path) -> Result<()> {
    let diagnostics = config_check(config);
    for line in &diagnostics {
        println!("{line}");
    }
    if diagnostics.iter().any(|l| l.starts_with("error:")) {
        anyhow::bail!("invalid configuration: {}", config.display());
    }
    Ok(())
}
