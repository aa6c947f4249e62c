//! # Validate Subcommand
//!
//! Builds a composite validator from the flags, runs it against the
//! bag, and renders the report. Which validator kinds run follows the
//! flags: payload integrity runs unless suppressed, the profile and
//! structure validators run when their profiles are supplied, and the
//! file-format validator runs when a plugin backend is selected.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};

use bagvet_core::Severity;
use bagvet_plugin::{ExtensionPlugin, FormatPlugin, JhoveConfig, JhovePlugin};
use bagvet_profile::{BagProfile, PayloadProfile};
use bagvet_validate::{
    BagReport, CompositeValidator, FileFormatValidator, FormatPolicy, PayloadIntegrityValidator,
    PayloadStructureValidator, ProfileValidator,
};

use crate::{EXIT_INVALID, EXIT_VALID};

/// Format plugin backends selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PluginChoice {
    /// Extension-heuristic reference backend, no external processes.
    Extension,
    /// JHOVE external-tool backend.
    Jhove,
}

/// Unsupported-format policy flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyChoice {
    /// Validate every file; plugins report unsupported formats.
    #[default]
    CheckAll,
    /// Skip files whose format the plugin does not claim.
    SkipUnsupported,
}

impl From<PolicyChoice> for FormatPolicy {
    fn from(choice: PolicyChoice) -> Self {
        match choice {
            PolicyChoice::CheckAll => FormatPolicy::CheckAll,
            PolicyChoice::SkipUnsupported => FormatPolicy::SkipUnsupported,
        }
    }
}

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// The JSON report contract.
    Json,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the bag directory.
    pub bag: PathBuf,

    /// Bag profile (JSON or YAML) for metadata conformance.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Payload profile (JSON or YAML) for directory-structure rules.
    /// Defaults to the profile's Payload-Profile reference, if any.
    #[arg(long)]
    pub payload_profile: Option<PathBuf>,

    /// Skip the payload-integrity (manifest/checksum) check.
    #[arg(long)]
    pub no_integrity: bool,

    /// Run file-format validation with the given backend.
    #[arg(long, value_enum)]
    pub formats: Option<PluginChoice>,

    /// JHOVE executable; defaults to the BAGVET_JHOVE_BIN environment.
    #[arg(long)]
    pub jhove_bin: Option<PathBuf>,

    /// JHOVE configuration file, passed as -c.
    #[arg(long)]
    pub jhove_conf: Option<PathBuf>,

    /// Per-invocation timeout for the external tool, in seconds.
    #[arg(long)]
    pub tool_timeout: Option<u64>,

    /// What to do with formats the plugin does not claim to validate.
    #[arg(long, value_enum, default_value = "check-all")]
    pub policy: PolicyChoice,

    /// Restrict format checking to bag-relative paths matching a regex.
    #[arg(long)]
    pub format_scope: Option<String>,

    /// Report rendering.
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Execute the validate subcommand.
///
/// Returns the process exit code for a completed run; configuration and
/// bag-open failures bubble up as errors and exit with code 2.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<u8> {
    let facade = build_facade(args)?;
    let report = facade
        .validate(&args.bag)
        .with_context(|| format!("validation of '{}' could not be completed", args.bag.display()))?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => render_text(&report),
    }

    Ok(if report.valid { EXIT_VALID } else { EXIT_INVALID })
}

fn build_facade(args: &ValidateArgs) -> anyhow::Result<CompositeValidator> {
    let mut facade = CompositeValidator::new();

    let mut payload_profile_path = args.payload_profile.clone();
    if let Some(profile_path) = &args.profile {
        let profile = BagProfile::load(profile_path)
            .with_context(|| format!("cannot load profile '{}'", profile_path.display()))?;
        if payload_profile_path.is_none() {
            payload_profile_path = profile
                .payload_profile
                .as_deref()
                .map(|reference| resolve_reference(profile_path, reference));
        }
        facade = facade.with_profile(ProfileValidator::new(profile)?);
    }

    if let Some(path) = &payload_profile_path {
        let profile = PayloadProfile::load(path)
            .with_context(|| format!("cannot load payload profile '{}'", path.display()))?;
        facade = facade.with_payload_structure(PayloadStructureValidator::new(profile)?);
    }

    if !args.no_integrity {
        facade = facade.with_payload_integrity(PayloadIntegrityValidator::new());
    }

    if let Some(choice) = args.formats {
        let plugin: Arc<dyn FormatPlugin> = match choice {
            PluginChoice::Extension => Arc::new(ExtensionPlugin::new()),
            PluginChoice::Jhove => Arc::new(build_jhove(args)?),
        };
        let mut validator = FileFormatValidator::new(plugin).with_policy(args.policy.into());
        if let Some(scope) = &args.format_scope {
            validator = validator.with_scope(scope)?;
        }
        facade = facade.with_file_format(validator);
    }

    Ok(facade)
}

fn build_jhove(args: &ValidateArgs) -> anyhow::Result<JhovePlugin> {
    // Explicit flags win; the environment is a convenience resolved
    // once per process start.
    let mut config = match &args.jhove_bin {
        Some(executable) => JhoveConfig::new(executable),
        None => JhoveConfig::from_env().context("no JHOVE executable configured")?,
    };
    if let Some(conf) = &args.jhove_conf {
        config.config_file = Some(conf.clone());
    }
    if let Some(secs) = args.tool_timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(JhovePlugin::new(config)?)
}

/// Resolve a profile-internal reference relative to the profile's own
/// directory, the way relative `$ref`s resolve in schema documents.
fn resolve_reference(profile_path: &Path, reference: &str) -> PathBuf {
    let reference_path = Path::new(reference);
    if reference_path.is_absolute() {
        return reference_path.to_path_buf();
    }
    match profile_path.parent() {
        Some(parent) => parent.join(reference_path),
        None => reference_path.to_path_buf(),
    }
}

fn render_text(report: &BagReport) {
    println!("bag: {}", report.bag.display());
    println!("report: {} at {}", report.report_id, report.generated_at);
    for (kind, result) in &report.by_kind {
        let verdict = if result.is_valid() { "ok" } else { "FAILED" };
        println!(
            "  {kind}: {verdict} ({} findings, {} errors)",
            result.findings().len(),
            result.error_count()
        );
        for finding in result.findings() {
            if finding.severity >= Severity::Warning {
                println!("    {finding}");
            } else {
                tracing::debug!(%finding, "info finding");
            }
        }
    }
    println!("verdict: {}", if report.valid { "VALID" } else { "INVALID" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagvet_core::ChecksumAlgorithm;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn args_for(bag: &Path) -> ValidateArgs {
        ValidateArgs {
            bag: bag.to_path_buf(),
            profile: None,
            payload_profile: None,
            no_integrity: false,
            formats: None,
            jhove_bin: None,
            jhove_conf: None,
            tool_timeout: None,
            policy: PolicyChoice::CheckAll,
            format_scope: None,
            output: OutputFormat::Text,
        }
    }

    fn sound_bag(root: &Path) {
        write(root, "bagit.txt", "BagIt-Version: 1.0\n");
        write(root, "bag-info.txt", "Source-Organization: State Archive\n");
        write(root, "data/a.txt", "alpha");
        let manifest = format!(
            "{}  data/a.txt\n",
            ChecksumAlgorithm::Sha256.hash_bytes(b"alpha"),
        );
        write(root, "manifest-sha256.txt", &manifest);
    }

    #[test]
    fn test_sound_bag_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());

        let code = run_validate(&args_for(dir.path())).unwrap();
        assert_eq!(code, EXIT_VALID);
    }

    #[test]
    fn test_tampered_bag_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        write(dir.path(), "data/a.txt", "tampered");

        let code = run_validate(&args_for(dir.path())).unwrap();
        assert_eq!(code, EXIT_INVALID);
    }

    #[test]
    fn test_missing_bag_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args_for(&dir.path().join("nope"));
        args.no_integrity = true;
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_profile_reference_pulls_in_structure_step() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        write(
            dir.path(),
            "profiles/bag.json",
            r#"{"Payload-Profile": "payload.json"}"#,
        );
        write(
            dir.path(),
            "profiles/payload.json",
            r#"{"Payload-Folders-Required": ["images/"]}"#,
        );

        let mut args = args_for(dir.path());
        args.profile = Some(dir.path().join("profiles/bag.json"));
        // images/ is required but absent, so the structure step fails.
        let code = run_validate(&args).unwrap();
        assert_eq!(code, EXIT_INVALID);
    }

    #[test]
    fn test_format_step_with_reference_plugin() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());

        let mut args = args_for(dir.path());
        args.formats = Some(PluginChoice::Extension);
        let code = run_validate(&args).unwrap();
        assert_eq!(code, EXIT_VALID);
    }

    #[test]
    fn test_reference_resolution_is_profile_relative() {
        assert_eq!(
            resolve_reference(Path::new("/profiles/bag.json"), "payload.json"),
            PathBuf::from("/profiles/payload.json")
        );
        assert_eq!(
            resolve_reference(Path::new("/profiles/bag.json"), "/abs/payload.json"),
            PathBuf::from("/abs/payload.json")
        );
    }
}
