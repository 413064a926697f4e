//! Verify PDF Signatures
//!
//! Checks every signature of one or more PDFs, counts signatures, lists the
//! keystore aliases usable for signing and extracts signed revisions.
//!
//! Usage:
//!   pdfsig verify --trust ca.pem signed.pdf
//!   pdfsig -v verify --fail-fast a.pdf b.pdf
//!   pdfsig count --names signed.pdf
//!   pdfsig keys --keystore signer.pem --password secret
//!   pdfsig extract --field Signature1 --out rev1.pdf signed.pdf

use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_sigcheck::keystore::{KeyAliasSelector, Keystore, PemKeystore};
use pdf_sigcheck::run::{
    exit_code, fail_fast_exit_code, VerificationRun, EXIT_ALL_PASSED, EXIT_OTHER_ERROR, EXIT_UNREADABLE,
};
use pdf_sigcheck::signatures::SignatureVerification;
use pdf_sigcheck::{Error, VerifierConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "pdfsig",
    version,
    about = "Verify signatures across PDF incremental revisions",
    long_about = "Verify PDF signatures, count them, extract signed revisions and list eligible signing keys."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every signature of the given PDFs
    Verify {
        /// Trust anchor file, PEM or DER (can be provided multiple times)
        #[arg(short, long)]
        trust: Vec<PathBuf>,

        /// Stop at the first signature that does not pass
        #[arg(long)]
        fail_fast: bool,

        /// PDF files to verify
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Count signatures
    Count {
        /// Print the field names instead of the count
        #[arg(long)]
        names: bool,

        /// PDF files to examine
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List keystore aliases usable for signing
    Keys {
        /// PEM keystore with private keys and certificates
        #[arg(short, long)]
        keystore: PathBuf,

        /// Password for encrypted keys
        #[arg(short, long)]
        password: Option<String>,

        /// Do not check certificate validity dates
        #[arg(long)]
        no_validity: bool,

        /// Do not check key usage
        #[arg(long)]
        no_key_usage: bool,

        /// Do not check critical extensions
        #[arg(long)]
        no_critical: bool,
    },

    /// Write the revision a signature field signed
    Extract {
        /// Signature field name
        #[arg(short, long)]
        field: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Signed PDF
        pdf: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            error_exit_code(&e)
        },
    };
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}

fn run(cli: Cli) -> pdf_sigcheck::Result<i32> {
    let config = match &cli.config {
        Some(path) => VerifierConfig::from_json_file(path)?,
        None => VerifierConfig::new(),
    };

    match cli.command {
        Commands::Verify { trust, fail_fast, files } => {
            let mut config = config;
            config.trust_anchor_files.extend(trust);
            if fail_fast {
                config.fail_fast = true;
            }
            verify(&config, &files)
        },
        Commands::Count { names, files } => Ok(count(&files, names)),
        Commands::Keys {
            keystore,
            password,
            no_validity,
            no_key_usage,
            no_critical,
        } => {
            let mut policy = config.policy;
            if no_validity {
                policy = policy.with_validity_check(false);
            }
            if no_key_usage {
                policy = policy.with_key_usage_check(false);
            }
            if no_critical {
                policy = policy.with_critical_extension_check(false);
            }
            let store = PemKeystore::open(&keystore, password.as_deref())?;
            for alias in KeyAliasSelector::select_aliases(store.entries(), &policy, Utc::now()) {
                println!("{}", alias);
            }
            Ok(EXIT_ALL_PASSED)
        },
        Commands::Extract { field, out, pdf } => {
            let bytes = std::fs::read(&pdf)?;
            let revision = VerificationRun::extract_revision(&bytes, &field)?;
            std::fs::write(&out, &revision)?;
            println!("{} bytes written to {}", revision.len(), out.display());
            Ok(EXIT_ALL_PASSED)
        },
    }
}

fn verify(config: &VerifierConfig, files: &[PathBuf]) -> pdf_sigcheck::Result<i32> {
    let run = VerificationRun::from_config(config)?;
    let mut results: Vec<SignatureVerification> = Vec::new();
    let mut unreadable = false;

    for path in files {
        let report = match read(path).and_then(|bytes| run.run(&bytes)) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                if config.fail_fast {
                    return Ok(error_exit_code(&e));
                }
                unreadable = true;
                continue;
            },
        };

        println!("{}: {} signature(s), {} revision(s)", path.display(), report.results.len(), report.total_revisions);
        for result in &report.results {
            print_result(result);
        }

        if config.fail_fast {
            if let Some(failed) = report.failures().next() {
                return Ok(fail_fast_exit_code(failed));
            }
        }
        results.extend(report.results);
    }

    if unreadable {
        return Ok(EXIT_UNREADABLE);
    }
    Ok(exit_code(&results))
}

fn count(files: &[PathBuf], names: bool) -> i32 {
    let mut code = EXIT_ALL_PASSED;
    for path in files {
        let outcome = read(path).and_then(|bytes| VerificationRun::names(&bytes));
        match outcome {
            Ok(fields) if names => println!("{}: {}", path.display(), fields.join(",")),
            Ok(fields) => println!("{}: {}", path.display(), fields.len()),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                code = EXIT_UNREADABLE;
            },
        }
    }
    code
}

fn read(path: &Path) -> pdf_sigcheck::Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

fn print_result(result: &SignatureVerification) {
    println!("  Signature '{}'", result.name);
    println!("    subject:           {}", result.subject.as_deref().unwrap_or("-"));
    match result.signing_time {
        Some(time) => println!("    signing time:      {}", time.to_rfc3339()),
        None => println!("    signing time:      -"),
    }
    println!("    revision:          {}/{}", result.revision_index, result.total_revisions);
    println!("    whole document:    {}", result.covers_whole_document);
    println!("    modified:          {}", result.modified);
    println!("    certification:     {}", result.certification_level);
    println!("    timestamp:         {}", result.timestamp_token_present);
    println!("    crl present:       {}", result.crl_present);
    println!("    ocsp present:      {}", result.ocsp_present);
    println!("    signer trusted:    {}", result.signer_directly_trusted);
    println!("    result:            {}", result.validation_code());
    for failure in &result.chain_failures {
        println!("    chain failure:     {}", failure);
    }
}

fn error_exit_code(e: &Error) -> i32 {
    match e {
        Error::Config(_) | Error::Json(_) | Error::Certificate(_) => EXIT_OTHER_ERROR,
        e if e.is_keystore_error() => EXIT_OTHER_ERROR,
        _ => EXIT_UNREADABLE,
    }
}
