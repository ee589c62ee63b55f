//! Command-line interface.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;

use crate::config::EncoderConfig;
use crate::decode::EncodedTree;
use crate::dump::dump_tree;
use crate::encoder::{encode_all, write_encoded};
use crate::tree::TreeDocument;

/// Encode parsed syntax trees into flat binary buffers.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Log level: `-v` debug, `-vv` trace, `-q` warn, `-qq` error, `-qqq` off.
    /// Defaults to info.
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Encode JSON tree documents.
    Encode(EncodeArgs),
    /// Print every record of an encoded buffer.
    Dump {
        /// Encoded buffer.
        buffer: PathBuf,
    },
    /// Check the structure of an encoded buffer.
    Verify {
        /// Encoded buffer.
        buffer: PathBuf,
    },
}

/// Arguments of `encode`.
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeArgs {
    /// JSON tree documents to encode.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file. Only valid with a single input; defaults to the input
    /// path with a `.bin` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File name stored with the root record.
    #[arg(long)]
    pub file_name: Option<String>,

    /// Identifier stored with the root record.
    #[arg(long)]
    pub id: Option<String>,

    /// Maximum number of items per list record.
    #[arg(long)]
    pub list_run: Option<u8>,

    /// JSON encoder configuration. Flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verify each buffer after encoding.
    #[arg(long)]
    pub verify: bool,
}

impl EncodeArgs {
    /// The encoder configuration these arguments describe.
    pub fn encoder_config(&self) -> Result<EncoderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => EncoderConfig::default(),
        };
        if let Some(file_name) = &self.file_name {
            config.file_name = Some(file_name.clone());
        }
        if let Some(id) = &self.id {
            config.source_id = Some(id.clone());
        }
        if let Some(list_run) = self.list_run {
            config.list_run = list_run;
        }
        config.verify |= self.verify;
        config.validate()?;
        Ok(config)
    }
}

/// Run a parsed command.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Encode(args) => {
            encode_files(&args)?;
        }
        Command::Dump { buffer } => {
            let bytes = read_buffer(&buffer)?;
            let tree = EncodedTree::parse(&bytes)
                .with_context(|| format!("Invalid buffer {}", buffer.display()))?;
            print!("{}", dump_tree(&tree)?);
        }
        Command::Verify { buffer } => {
            let bytes = read_buffer(&buffer)?;
            let tree = EncodedTree::parse(&bytes)
                .with_context(|| format!("Invalid buffer {}", buffer.display()))?;
            tree.verify()
                .with_context(|| format!("Verification failed for {}", buffer.display()))?;
            println!(
                "{}: ok ({} nodes, {} strings)",
                buffer.display(),
                tree.node_count(),
                tree.string_count()
            );
        }
    }
    Ok(())
}

/// Encode every input and return the written output paths, in input order.
pub fn encode_files(args: &EncodeArgs) -> Result<Vec<PathBuf>> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output can only be used with a single input");
    }
    let config = args.encoder_config()?;

    let documents = args
        .inputs
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;

    let results = encode_all(&documents, &config);

    let mut outputs = Vec::with_capacity(results.len());
    let mut failures = 0;
    for (input, result) in args.inputs.iter().zip(results) {
        match result {
            Ok(buf) => {
                let output = args.output.clone().unwrap_or_else(|| input.with_extension("bin"));
                write_encoded(&output, &buf)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                log::info!("{} -> {} ({} bytes)", input.display(), output.display(), buf.len());
                outputs.push(output);
            }
            Err(err) => {
                log::error!("{}: {}", input.display(), err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} inputs failed to encode", failures, args.inputs.len()));
    }
    Ok(outputs)
}

fn read_document(path: &Path) -> Result<TreeDocument> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    TreeDocument::from_json(&contents)
        .with_context(|| format!("Invalid tree document {}", path.display()))
}

fn read_buffer(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
