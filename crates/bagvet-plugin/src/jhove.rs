//! # JHOVE External-Tool Plugin
//!
//! Deep format validation through JHOVE, the Open Preservation
//! Foundation's object validation tool (<https://jhove.openpreservation.org/>).
//! Identification is in-process (magic-number sniffing with an extension
//! fallback); validation invokes the JHOVE executable out-of-process
//! with JSON output and maps its message vocabulary into findings.
//!
//! ## Configuration
//!
//! The executable location, optional configuration file, and
//! per-invocation timeout arrive in an explicit [`JhoveConfig`].
//! [`JhoveConfig::from_env`] is a convenience that resolves
//! `BAGVET_JHOVE_BIN`, `BAGVET_JHOVE_CONF`, and
//! `BAGVET_JHOVE_TIMEOUT_SECS` once at startup; nothing reads the
//! environment per call. A missing or non-executable tool is a
//! configuration error at plugin construction, not per file.
//!
//! ## Failure Mapping
//!
//! A crash, timeout, nonzero exit, or unparseable response for one file
//! is a `Plugin` error; the file-format validator converts it into a
//! single ERROR finding for that file and continues with the rest of
//! the batch. No automatic retries: an auditable failure beats a hidden
//! retry against nondeterministic external-process state.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Deserialize;

use bagvet_core::{BagvetError, Finding, FindingCode, ValidationResult};

use crate::interface::{
    FormatIdentification, FormatPlugin, IdentificationEvidence, PluginDescriptor,
};
use crate::media;

/// How many leading bytes identification reads for signature sniffing.
const SNIFF_LEN: usize = 8192;

/// Poll interval while waiting for the external process.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// JHOVE modules with the media types they validate. The empty module
/// name lets JHOVE pick a module itself, which it does acceptably for
/// plain text.
const MODULES: &[(&str, &[&str])] = &[
    ("", &["text/plain"]),
    ("AIFF-hul", &["audio/x-aiff"]),
    ("GIF-hul", &["image/gif"]),
    ("HTML-hul", &["text/html"]),
    ("JPEG-hul", &["image/jpeg"]),
    ("JPEG2000-hul", &["image/jp2", "image/jpx"]),
    ("PDF-hul", &["application/pdf"]),
    ("PNG-gdm", &["image/png"]),
    ("TIFF-hul", &["image/tiff", "image/tiff-fx", "image/ief"]),
    ("WAVE-hul", &["audio/vnd.wave"]),
    ("XML-hul", &["text/xml"]),
];

/// Explicit configuration for the JHOVE backend.
#[derive(Debug, Clone)]
pub struct JhoveConfig {
    /// Path to the JHOVE launcher.
    pub executable: PathBuf,
    /// Optional JHOVE configuration file, passed as `-c`.
    pub config_file: Option<PathBuf>,
    /// Per-invocation wall-clock budget.
    pub timeout: Duration,
}

impl JhoveConfig {
    /// Default per-invocation timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Configuration pointing at the given executable, with no config
    /// file and the default timeout.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            config_file: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Resolve configuration from the environment once, at startup.
    ///
    /// Reads `BAGVET_JHOVE_BIN` (required), `BAGVET_JHOVE_CONF`
    /// (optional), and `BAGVET_JHOVE_TIMEOUT_SECS` (optional).
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when `BAGVET_JHOVE_BIN` is unset or
    /// the timeout value is not a number of seconds.
    pub fn from_env() -> Result<Self, BagvetError> {
        let executable = std::env::var("BAGVET_JHOVE_BIN").map_err(|_| {
            BagvetError::configuration(
                "BAGVET_JHOVE_BIN is not set; pass the JHOVE location explicitly or export it",
            )
        })?;
        let mut config = Self::new(executable);
        if let Ok(conf) = std::env::var("BAGVET_JHOVE_CONF") {
            config.config_file = Some(PathBuf::from(conf));
        }
        if let Ok(secs) = std::env::var("BAGVET_JHOVE_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                BagvetError::configuration(format!(
                    "BAGVET_JHOVE_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The JHOVE-backed format plugin.
#[derive(Debug)]
pub struct JhovePlugin {
    config: JhoveConfig,
    descriptor: PluginDescriptor,
}

impl JhovePlugin {
    /// Construct the plugin, verifying the executable up front.
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when the executable or the declared
    /// configuration file does not exist. Discovering this at load time
    /// keeps a misconfigured backend from producing one failure per
    /// payload file.
    pub fn new(config: JhoveConfig) -> Result<Self, BagvetError> {
        if !config.executable.is_file() {
            return Err(BagvetError::configuration(format!(
                "JHOVE executable not found at '{}'",
                config.executable.display()
            )));
        }
        if let Some(conf) = &config.config_file {
            if !conf.is_file() {
                return Err(BagvetError::configuration(format!(
                    "JHOVE configuration file not found at '{}'",
                    conf.display()
                )));
            }
        }

        let default_formats: Vec<String> = MODULES
            .iter()
            .flat_map(|(_, media_types)| media_types.iter().map(|m| (*m).to_string()))
            .collect();
        let module_map = MODULES
            .iter()
            .filter(|(module, _)| !module.is_empty())
            .map(|(module, media_types)| format!("{module}: {}", media_types.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");

        Ok(Self {
            descriptor: PluginDescriptor {
                name: "jhove".into(),
                summary: "deep format validation through the JHOVE tool".into(),
                description: format!(
                    "Validates file formats out-of-process with JHOVE \
                     (https://jhove.openpreservation.org/). Module map: {module_map}"
                ),
                default_formats,
            },
            config,
        })
    }

    /// The module responsible for a media type, if any.
    fn module_for(media_type: &str) -> Option<&'static str> {
        MODULES
            .iter()
            .find(|(_, media_types)| media_types.contains(&media_type))
            .map(|(module, _)| *module)
    }

    /// Run JHOVE against one file and capture its JSON report.
    fn invoke(&self, path: &Path, module: &str) -> Result<String, BagvetError> {
        let mut command = Command::new(&self.config.executable);
        command.args(["-l", "OFF", "-e", "utf8"]);
        if let Some(conf) = &self.config.config_file {
            command.arg("-c").arg(conf);
        }
        if !module.is_empty() {
            command.args(["-m", module]);
        }
        command.args(["-h", "JSON"]).arg(path);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        tracing::debug!(file = %path.display(), module, "invoking jhove");

        let mut child = command.spawn().map_err(|e| {
            BagvetError::plugin("jhove", format!("failed to spawn '{}': {e}", self.config.executable.display()))
        })?;
        let stdout = drain_thread(child.stdout.take());
        let stderr = drain_thread(child.stderr.take());

        let status = wait_with_timeout(&mut child, self.config.timeout).map_err(|e| {
            tracing::warn!(file = %path.display(), error = %e, "jhove invocation failed");
            e
        })?;

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let detail = String::from_utf8_lossy(&stderr);
            return Err(BagvetError::plugin(
                "jhove",
                format!(
                    "exited with {status} for '{}': {}",
                    path.display(),
                    detail.trim()
                ),
            ));
        }
        String::from_utf8(stdout)
            .map_err(|_| BagvetError::plugin("jhove", "response was not valid UTF-8"))
    }
}

impl FormatPlugin for JhovePlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn identify(&self, path: &Path) -> Result<FormatIdentification, BagvetError> {
        let mut file = std::fs::File::open(path).map_err(|e| BagvetError::io(path, e))?;
        let mut buf = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        loop {
            let read = file
                .read(&mut buf[filled..])
                .map_err(|e| BagvetError::io(path, e))?;
            if read == 0 {
                break;
            }
            filled += read;
            if filled == buf.len() {
                break;
            }
        }
        buf.truncate(filled);

        if let Some(kind) = infer::get(&buf) {
            return Ok(FormatIdentification::identified(
                path,
                kind.mime_type(),
                IdentificationEvidence::Signature,
            ));
        }

        // Text formats carry no magic number; fall back to the suffix.
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(media::media_type_for_extension);
        Ok(match by_extension {
            Some(media_type) => {
                FormatIdentification::identified(path, media_type, IdentificationEvidence::Extension)
            }
            None => FormatIdentification::unknown(path),
        })
    }

    fn validate(&self, path: &Path, media_type: &str) -> Result<ValidationResult, BagvetError> {
        let Some(module) = Self::module_for(media_type) else {
            let mut result = ValidationResult::new();
            result.record(
                Finding::info(
                    FindingCode::FormatUnsupported,
                    format!("no JHOVE module covers '{media_type}'"),
                )
                .with_subject(path.display().to_string()),
            );
            return Ok(result);
        };

        let response = self.invoke(path, module)?;
        parse_report(&response, path)
    }
}

/// The subset of the JHOVE JSON response the mapping consumes.
#[derive(Debug, Deserialize)]
struct JhoveResponse {
    jhove: JhoveBody,
}

#[derive(Debug, Deserialize)]
struct JhoveBody {
    #[serde(rename = "repInfo", default)]
    rep_info: Vec<RepInfo>,
}

#[derive(Debug, Deserialize)]
struct RepInfo {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    messages: Vec<RepMessage>,
}

#[derive(Debug, Deserialize)]
struct RepMessage {
    message: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// Status line JHOVE reports for a fully conforming file.
const STATUS_VALID: &str = "Well-Formed and valid";

/// Map a JHOVE JSON response into a validation result.
///
/// # Errors
///
/// `BagvetError::Plugin` when the response does not have the expected
/// shape; a garbled report is a tool failure, not a verdict.
fn parse_report(response: &str, path: &Path) -> Result<ValidationResult, BagvetError> {
    let parsed: JhoveResponse = serde_json::from_str(response)
        .map_err(|e| BagvetError::plugin("jhove", format!("malformed JSON response: {e}")))?;
    let rep_info = parsed
        .jhove
        .rep_info
        .into_iter()
        .next()
        .ok_or_else(|| BagvetError::plugin("jhove", "response carried no repInfo section"))?;

    let subject = path.display().to_string();
    let mut result = ValidationResult::new();

    for message in rep_info.messages {
        let text = match &message.id {
            Some(id) => format!("{} ({id})", message.message),
            None => message.message,
        };
        let finding = match message.severity.as_deref() {
            Some("info") => Finding::info(FindingCode::ToolReport, text),
            _ => Finding::error(FindingCode::FormatMalformed, text),
        };
        result.record(finding.with_subject(subject.clone()));
    }

    match rep_info.status.as_deref() {
        Some(STATUS_VALID) => {
            if result.is_valid() {
                result.record(
                    Finding::info(FindingCode::FormatWellFormed, "file is well-formed and valid")
                        .with_subject(subject),
                );
            }
        }
        Some(status) => {
            result.record(
                Finding::error(
                    FindingCode::FormatMalformed,
                    format!("JHOVE status: {status}"),
                )
                .with_subject(subject),
            );
        }
        None => {
            result.record(
                Finding::error(FindingCode::FormatMalformed, "JHOVE reported no status")
                    .with_subject(subject),
            );
        }
    }
    Ok(result)
}

/// Read a child stream to the end on a separate thread, so the pipe can
/// never fill and deadlock the wait loop.
fn drain_thread<R: Read + Send + 'static>(
    stream: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for the child within the budget, killing it on expiry.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<std::process::ExitStatus, BagvetError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BagvetError::plugin(
                        "jhove",
                        format!("timed out after {}s", timeout.as_secs_f64()),
                    ));
                }
                std::thread::sleep(WAIT_POLL);
            }
            Err(e) => {
                return Err(BagvetError::plugin(
                    "jhove",
                    format!("failed to poll process: {e}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_RESPONSE: &str = r#"{
        "jhove": {
            "repInfo": [
                { "status": "Well-Formed and valid", "messages": [] }
            ]
        }
    }"#;

    const INVALID_RESPONSE: &str = r#"{
        "jhove": {
            "repInfo": [
                {
                    "status": "Not well-formed",
                    "messages": [
                        { "severity": "error", "message": "No PNG header", "id": "PNG-GDM-1" },
                        { "severity": "info", "message": "ByteOffset: 0" }
                    ]
                }
            ]
        }
    }"#;

    #[test]
    fn test_missing_executable_is_configuration_error() {
        let err = JhovePlugin::new(JhoveConfig::new("/nonexistent/jhove")).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/nonexistent/jhove"));
    }

    #[test]
    fn test_parse_valid_report() {
        let result = parse_report(VALID_RESPONSE, Path::new("data/a.png")).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.findings()[0].code, FindingCode::FormatWellFormed);
    }

    #[test]
    fn test_parse_invalid_report_maps_severities() {
        let result = parse_report(INVALID_RESPONSE, Path::new("data/a.png")).unwrap();
        assert!(!result.is_valid());

        let codes: Vec<FindingCode> = result.findings().iter().map(|f| f.code).collect();
        assert!(codes.contains(&FindingCode::FormatMalformed));
        assert!(codes.contains(&FindingCode::ToolReport));
        assert!(result.findings()[0].message.contains("PNG-GDM-1"));
        assert!(result
            .findings()
            .iter()
            .all(|f| f.subject.as_deref() == Some("data/a.png")));
    }

    #[test]
    fn test_parse_garbage_is_plugin_error() {
        let err = parse_report("jhove exploded", Path::new("x")).unwrap_err();
        assert!(matches!(err, BagvetError::Plugin { .. }));
    }

    #[test]
    fn test_module_routing() {
        assert_eq!(JhovePlugin::module_for("application/pdf"), Some("PDF-hul"));
        assert_eq!(JhovePlugin::module_for("text/plain"), Some(""));
        assert_eq!(JhovePlugin::module_for("model/step"), None);
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("jhove");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_fake_tool_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("#!/bin/sh\ncat <<'EOF'\n{VALID_RESPONSE}\nEOF\n");
        let tool = fake_tool(dir.path(), &script);

        let target = dir.path().join("a.pdf");
        fs::write(&target, "%PDF-1.4").unwrap();

        let plugin = JhovePlugin::new(JhoveConfig::new(tool)).unwrap();
        let result = plugin.validate(&target, "application/pdf").unwrap();
        assert!(result.is_valid());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_timeout_is_plugin_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "#!/bin/sh\nsleep 5\n");

        let target = dir.path().join("a.pdf");
        fs::write(&target, "%PDF-1.4").unwrap();

        let plugin = JhovePlugin::new(
            JhoveConfig::new(tool).with_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        let err = plugin.validate(&target, "application/pdf").unwrap_err();
        assert!(matches!(err, BagvetError::Plugin { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_plugin_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "#!/bin/sh\necho boom >&2\nexit 3\n");

        let target = dir.path().join("a.pdf");
        fs::write(&target, "%PDF-1.4").unwrap();

        let plugin = JhovePlugin::new(JhoveConfig::new(tool)).unwrap();
        let err = plugin.validate(&target, "application/pdf").unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_unsupported_media_type_is_info_finding() {
        let dir = tempfile::tempdir().unwrap();
        #[cfg(unix)]
        let tool = fake_tool(dir.path(), "#!/bin/sh\nexit 0\n");
        #[cfg(not(unix))]
        let tool = {
            let path = dir.path().join("jhove");
            fs::write(&path, "").unwrap();
            path
        };

        let target = dir.path().join("model.step");
        fs::write(&target, "ISO-10303").unwrap();

        let plugin = JhovePlugin::new(JhoveConfig::new(tool)).unwrap();
        let result = plugin.validate(&target, "model/step").unwrap();
        assert!(result.is_valid());
        assert_eq!(result.findings()[0].code, FindingCode::FormatUnsupported);
    }

    #[test]
    fn test_identify_signature_beats_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabeled.txt");
        // PNG signature bytes.
        fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]).unwrap();

        #[cfg(unix)]
        let tool = fake_tool(dir.path(), "#!/bin/sh\nexit 0\n");
        #[cfg(not(unix))]
        let tool = {
            let path = dir.path().join("jhove");
            fs::write(&path, "").unwrap();
            path
        };

        let plugin = JhovePlugin::new(JhoveConfig::new(tool)).unwrap();
        let id = plugin.identify(&path).unwrap();
        assert_eq!(id.media_type.as_deref(), Some("image/png"));
        assert_eq!(id.evidence, IdentificationEvidence::Signature);
    }

    #[test]
    fn test_identify_empty_file_is_unknown_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();

        #[cfg(unix)]
        let tool = fake_tool(dir.path(), "#!/bin/sh\nexit 0\n");
        #[cfg(not(unix))]
        let tool = {
            let path = dir.path().join("jhove");
            fs::write(&path, "").unwrap();
            path
        };

        let plugin = JhovePlugin::new(JhoveConfig::new(tool)).unwrap();
        let id = plugin.identify(&path).unwrap();
        assert!(id.is_unknown());
    }
}
