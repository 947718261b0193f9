//! bindspec CLI
//!
//! Command-line interface for canonicalizing JSON, normalizing schemas,
//! checking directional compatibility, and validating interface documents.

use std::path::PathBuf;
use std::process::ExitCode;

use bindspec::{
    canonicalize, load_document, load_json, Fetcher, NormalizeError, Normalizer, ValidateOptions,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

#[derive(Parser)]
#[command(name = "bindspec")]
#[command(about = "Canonical JSON and schema compatibility tooling for bindspec documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the canonical (RFC 8785) JSON bytes of a document
    Canon {
        /// JSON file to canonicalize
        file: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Normalize a schema per the compatibility profile
    Normalize {
        /// Schema file to normalize
        schema: PathBuf,

        /// Document used to resolve fragment-only $refs
        #[arg(long)]
        root: Option<PathBuf>,

        /// Base URL for resolving relative $refs
        #[arg(long)]
        base: Option<String>,

        /// Allow external $refs to be fetched over HTTP(S)
        #[arg(long)]
        remote: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check directional schema compatibility
    Compat {
        /// Target schema file (the contract to satisfy)
        target: PathBuf,

        /// Candidate schema file (the contract standing in)
        candidate: PathBuf,

        /// Check the candidate as an input (writer) contract
        #[arg(long, conflicts_with = "output", required_unless_present = "output")]
        input: bool,

        /// Check the candidate as an output (reader) contract
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        output: bool,

        /// Document used to resolve fragment-only $refs
        #[arg(long)]
        root: Option<PathBuf>,

        /// Base URL for resolving relative $refs
        #[arg(long)]
        base: Option<String>,

        /// Allow external $refs to be fetched over HTTP(S)
        #[arg(long)]
        remote: bool,
    },

    /// Shape-validate an interface document
    Validate {
        /// Interface document file
        document: PathBuf,

        /// Treat unknown (non x-) fields as errors
        #[arg(long)]
        strict: bool,

        /// Require event operations to declare a payload schema
        #[arg(long)]
        require_event_payload: bool,

        /// Require the format version to be in the supported range
        #[arg(long)]
        require_supported_version: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Canon { file, output } => run_canon(&file, output.as_deref()),
        Commands::Normalize {
            schema,
            root,
            base,
            remote,
            pretty,
            output,
        } => run_normalize(
            &schema,
            root.as_deref(),
            base.as_deref(),
            remote,
            pretty,
            output.as_deref(),
        ),
        Commands::Compat {
            target,
            candidate,
            input,
            output: _,
            root,
            base,
            remote,
        } => run_compat(
            &target,
            &candidate,
            input,
            root.as_deref(),
            base.as_deref(),
            remote,
        ),
        Commands::Validate {
            document,
            strict,
            require_event_payload,
            require_supported_version,
        } => run_validate(
            &document,
            strict,
            require_event_payload,
            require_supported_version,
        ),
    }
}

fn fail(message: impl std::fmt::Display, code: i32) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::from(code as u8)
}

fn write_output(output: Option<&std::path::Path>, bytes: &[u8]) -> ExitCode {
    match output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, bytes) {
                return fail(format!("cannot write {}: {err}", path.display()), 3);
            }
        }
        None => {
            let mut text = String::from_utf8_lossy(bytes).into_owned();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            print!("{text}");
        }
    }
    ExitCode::SUCCESS
}

fn run_canon(file: &std::path::Path, output: Option<&std::path::Path>) -> ExitCode {
    let value = match load_json(file) {
        Ok(value) => value,
        Err(err) => return fail(&err, err.exit_code()),
    };
    match canonicalize(&value) {
        Ok(bytes) => write_output(output, &bytes),
        Err(err) => fail(&err, err.exit_code()),
    }
}

/// Resolver inputs shared by `normalize` and `compat`.
struct ResolveSetup {
    root: Option<Value>,
    base: Option<Url>,
    remote: bool,
}

impl ResolveSetup {
    fn load(
        root: Option<&std::path::Path>,
        base: Option<&str>,
        remote: bool,
    ) -> Result<Self, ExitCode> {
        let root = match root {
            Some(path) => match load_json(path) {
                Ok(value) => Some(value),
                Err(err) => return Err(fail(&err, err.exit_code())),
            },
            None => None,
        };
        let base = match base {
            Some(raw) => match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(err) => return Err(fail(format!("invalid --base URL: {err}"), 2)),
            },
            None => None,
        };
        Ok(Self { root, base, remote })
    }

    fn normalizer<'a>(&'a self, fetcher: Option<&'a dyn Fetcher>) -> Normalizer<'a> {
        let mut normalizer = Normalizer::new();
        if let Some(root) = &self.root {
            normalizer = normalizer.with_root(root);
        }
        if let Some(base) = &self.base {
            normalizer = normalizer.with_base(base.clone());
        }
        if let Some(fetcher) = fetcher {
            normalizer = normalizer.with_fetcher(fetcher);
        }
        normalizer
    }

    fn fetcher(&self) -> Result<Option<Box<dyn Fetcher>>, ExitCode> {
        if !self.remote {
            return Ok(None);
        }
        #[cfg(feature = "remote")]
        {
            Ok(Some(Box::new(bindspec::HttpFetcher)))
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(fail(
                "--remote requires a build with the \"remote\" feature",
                2,
            ))
        }
    }
}

fn run_normalize(
    schema: &std::path::Path,
    root: Option<&std::path::Path>,
    base: Option<&str>,
    remote: bool,
    pretty: bool,
    output: Option<&std::path::Path>,
) -> ExitCode {
    let schema = match load_json(schema) {
        Ok(value) => value,
        Err(err) => return fail(&err, err.exit_code()),
    };
    let setup = match ResolveSetup::load(root, base, remote) {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let fetcher = match setup.fetcher() {
        Ok(fetcher) => fetcher,
        Err(code) => return code,
    };

    let mut normalizer = setup.normalizer(fetcher.as_deref());
    let normalized = match normalizer.normalize(&schema) {
        Ok(value) => value,
        Err(err) => return fail(&err, err.exit_code()),
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&normalized)
    } else {
        serde_json::to_string(&normalized)
    };
    match rendered {
        Ok(text) => write_output(output, text.as_bytes()),
        Err(err) => fail(&err, 2),
    }
}

fn run_compat(
    target: &std::path::Path,
    candidate: &std::path::Path,
    is_input: bool,
    root: Option<&std::path::Path>,
    base: Option<&str>,
    remote: bool,
) -> ExitCode {
    let target = match load_json(target) {
        Ok(value) => value,
        Err(err) => return fail(&err, err.exit_code()),
    };
    let candidate = match load_json(candidate) {
        Ok(value) => value,
        Err(err) => return fail(&err, err.exit_code()),
    };
    let setup = match ResolveSetup::load(root, base, remote) {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let fetcher = match setup.fetcher() {
        Ok(fetcher) => fetcher,
        Err(code) => return code,
    };

    let mut normalizer = setup.normalizer(fetcher.as_deref());
    let verdict: Result<bool, NormalizeError> = if is_input {
        normalizer.input_compatible(&target, &candidate)
    } else {
        normalizer.output_compatible(&target, &candidate)
    };

    match verdict {
        Ok(true) => {
            println!("compatible");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("incompatible");
            ExitCode::from(1)
        }
        Err(err) => fail(&err, err.exit_code()),
    }
}

fn run_validate(
    document: &std::path::Path,
    strict: bool,
    require_event_payload: bool,
    require_supported_version: bool,
) -> ExitCode {
    let document = match load_document(document) {
        Ok(doc) => doc,
        Err(err) => return fail(&err, err.exit_code()),
    };

    let options = ValidateOptions::new()
        .reject_unknown_fields(strict)
        .require_event_payload(require_event_payload)
        .require_supported_version(require_supported_version);

    match document.validate(&options) {
        Ok(()) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            for problem in &err.problems {
                eprintln!("{problem}");
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
