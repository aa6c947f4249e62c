//! # Bag Access Layer
//!
//! A read-only view of a BagIt bag on disk: the `bagit.txt` declaration,
//! the ordered `bag-info.txt` tag list, the per-algorithm payload
//! manifests, and deterministic payload enumeration.
//!
//! ## Tolerance Contract
//!
//! Opening a bag fails only when the root itself is unreadable. A missing
//! declaration, missing tag file, or missing manifest is recorded as
//! absence, because those conditions are verdicts for the validators to
//! report, not load failures. The layer never mutates the bag.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::checksum::ChecksumAlgorithm;
use crate::error::BagvetError;

/// Name of the payload directory inside a bag.
pub const PAYLOAD_DIR: &str = "data";

/// Name of the bag declaration file.
pub const DECLARATION_FILE: &str = "bagit.txt";

/// Name of the bag metadata tag file.
pub const TAG_FILE: &str = "bag-info.txt";

/// One metadata tag from `bag-info.txt`. Tags are ordered and repeatable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag name as written, case preserved.
    pub name: String,
    /// Tag value with continuation lines folded in.
    pub value: String,
}

/// Contents of `bagit.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BagDeclaration {
    /// Declared `BagIt-Version`, if present.
    pub version: Option<String>,
    /// Declared `Tag-File-Character-Encoding`, if present.
    pub encoding: Option<String>,
}

/// One `manifest-<algorithm>.txt` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Declared checksum, lowercase hex.
    pub checksum: String,
    /// Bag-relative payload path, forward slashes (`data/...`).
    pub path: String,
}

/// A parsed payload manifest, entries in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Algorithm named by the manifest filename.
    pub algorithm: ChecksumAlgorithm,
    /// Entries in the order they appear in the manifest file.
    pub entries: Vec<ManifestEntry>,
}

/// Parsed `Payload-Oxum` value: `<octet-count>.<stream-count>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayloadOxum {
    /// Total payload size in bytes.
    pub octet_count: u64,
    /// Number of payload files.
    pub stream_count: u64,
}

impl PayloadOxum {
    /// Parse the `<octets>.<streams>` form. Returns `None` on any other shape.
    pub fn parse(value: &str) -> Option<Self> {
        let (octets, streams) = value.split_once('.')?;
        Some(Self {
            octet_count: octets.parse().ok()?,
            stream_count: streams.parse().ok()?,
        })
    }
}

/// A validation target on disk.
///
/// Lifecycle: read-only. The validator opens an existing bag and never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Bag {
    root: PathBuf,
    declaration: Option<BagDeclaration>,
    tags: Vec<Tag>,
    manifests: BTreeMap<ChecksumAlgorithm, Manifest>,
    unknown_manifest_algorithms: Vec<String>,
}

impl Bag {
    /// Open the bag rooted at `root`.
    ///
    /// Reads the declaration, tag file, and every payload manifest that
    /// is present. Manifest files naming an algorithm outside the
    /// supported set are recorded by name so integrity checking can
    /// refuse them explicitly.
    ///
    /// # Errors
    ///
    /// Returns `BagvetError::Io` if `root` is not a readable directory
    /// or a file that does exist cannot be read.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BagvetError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(BagvetError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "bag root is not a directory"),
            ));
        }

        let declaration = read_declaration(&root)?;
        let tags = read_tag_file(&root.join(TAG_FILE))?;

        let mut manifests = BTreeMap::new();
        let mut unknown_manifest_algorithms = Vec::new();
        let entries = std::fs::read_dir(&root).map_err(|e| BagvetError::io(&root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| BagvetError::io(&root, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(algorithm_name) = name
                .strip_prefix("manifest-")
                .and_then(|rest| rest.strip_suffix(".txt"))
            else {
                continue;
            };
            match algorithm_name.parse::<ChecksumAlgorithm>() {
                Ok(algorithm) => {
                    let manifest = read_manifest(&entry.path(), algorithm)?;
                    manifests.insert(algorithm, manifest);
                }
                Err(_) => unknown_manifest_algorithms.push(algorithm_name.to_string()),
            }
        }
        unknown_manifest_algorithms.sort();

        tracing::debug!(
            bag = %root.display(),
            manifests = manifests.len(),
            tags = tags.len(),
            "opened bag"
        );

        Ok(Self {
            root,
            declaration,
            tags,
            manifests,
            unknown_manifest_algorithms,
        })
    }

    /// The bag root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The payload root (`<root>/data`), whether or not it exists.
    pub fn payload_root(&self) -> PathBuf {
        self.root.join(PAYLOAD_DIR)
    }

    /// The `bagit.txt` contents, if the file exists.
    pub fn declaration(&self) -> Option<&BagDeclaration> {
        self.declaration.as_ref()
    }

    /// All metadata tags in file order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Whether a `bag-info.txt` tag file was found.
    pub fn has_tag_file(&self) -> bool {
        self.root.join(TAG_FILE).is_file()
    }

    /// Every value of the named tag, in file order. Tag names match exactly.
    pub fn tag_values(&self, name: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| t.name == name)
            .map(|t| t.value.as_str())
            .collect()
    }

    /// The parsed `Payload-Oxum` tag value, if present and well-formed.
    pub fn payload_oxum(&self) -> Option<PayloadOxum> {
        let raw = self.tag_values("Payload-Oxum").into_iter().next()?;
        PayloadOxum::parse(raw)
    }

    /// Payload manifests, keyed by algorithm.
    pub fn manifests(&self) -> &BTreeMap<ChecksumAlgorithm, Manifest> {
        &self.manifests
    }

    /// The manifest for one algorithm, if present.
    pub fn manifest(&self, algorithm: ChecksumAlgorithm) -> Option<&Manifest> {
        self.manifests.get(&algorithm)
    }

    /// Manifest filenames whose algorithm is outside the supported set.
    pub fn unknown_manifest_algorithms(&self) -> &[String] {
        &self.unknown_manifest_algorithms
    }

    /// Every payload file, absolute paths, lexicographic walk order.
    ///
    /// A missing payload directory yields an empty list; its absence is
    /// a verdict for the validators, not a load failure.
    ///
    /// # Errors
    ///
    /// Returns `BagvetError::Io` if the walk hits an unreadable directory.
    pub fn payload_files(&self) -> Result<Vec<PathBuf>, BagvetError> {
        let payload_root = self.payload_root();
        if !payload_root.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&payload_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| payload_root.clone());
                BagvetError::io(path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Render an absolute path inside the bag as a bag-relative
    /// forward-slash path, the form manifests use.
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.join("/")
    }

    /// Resolve a manifest-style relative path against the bag root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in relative.split('/') {
            path.push(part);
        }
        path
    }
}

fn read_declaration(root: &Path) -> Result<Option<BagDeclaration>, BagvetError> {
    let path = root.join(DECLARATION_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let tags = read_tag_file(&path)?;
    let mut declaration = BagDeclaration::default();
    for tag in tags {
        match tag.name.as_str() {
            "BagIt-Version" => declaration.version = Some(tag.value),
            "Tag-File-Character-Encoding" => declaration.encoding = Some(tag.value),
            _ => {}
        }
    }
    Ok(Some(declaration))
}

/// Parse a BagIt tag file: `Name: value` lines, with continuation lines
/// indented by whitespace folding into the previous value.
///
/// Lines without a colon cannot belong to any tag; they are skipped with
/// a warning rather than aborting the load.
fn read_tag_file(path: &Path) -> Result<Vec<Tag>, BagvetError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| BagvetError::io(path, e))?;

    let mut tags: Vec<Tag> = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            match tags.last_mut() {
                Some(tag) => {
                    tag.value.push(' ');
                    tag.value.push_str(line.trim());
                }
                None => tracing::warn!(
                    file = %path.display(),
                    line = line_number + 1,
                    "continuation line before any tag, skipped"
                ),
            }
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => tags.push(Tag {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            }),
            None => tracing::warn!(
                file = %path.display(),
                line = line_number + 1,
                "tag line without ':', skipped"
            ),
        }
    }
    Ok(tags)
}

/// Parse one payload manifest: `<checksum><whitespace><path>` per line.
///
/// Paths keep their manifest form (forward slashes, relative to the bag
/// root). The `%0A`, `%0D`, and `%25` escapes from BagIt 1.0 are decoded.
fn read_manifest(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Manifest, BagvetError> {
    let content = std::fs::read_to_string(path).map_err(|e| BagvetError::io(path, e))?;

    let mut entries = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(split_at) = line.find(char::is_whitespace) else {
            tracing::warn!(
                file = %path.display(),
                line = line_number + 1,
                "manifest line without separator, skipped"
            );
            continue;
        };
        let (checksum, rest) = line.split_at(split_at);
        entries.push(ManifestEntry {
            checksum: checksum.trim().to_ascii_lowercase(),
            path: decode_manifest_path(rest.trim_start()),
        });
    }
    Ok(Manifest { algorithm, entries })
}

fn decode_manifest_path(raw: &str) -> String {
    raw.replace("%0A", "\n")
        .replace("%0D", "\r")
        .replace("%25", "%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn minimal_bag(root: &Path) {
        write(
            root,
            "bagit.txt",
            "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n",
        );
        write(
            root,
            "bag-info.txt",
            "Source-Organization: State Archive\nPayload-Oxum: 11.2\n",
        );
        write(root, "data/a.txt", "alpha");
        write(root, "data/sub/b.txt", "betaxx");
        write(
            root,
            "manifest-sha256.txt",
            "aaaa  data/a.txt\nbbbb  data/sub/b.txt\n",
        );
    }

    #[test]
    fn test_open_reads_declaration_tags_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        minimal_bag(dir.path());

        let bag = Bag::open(dir.path()).unwrap();
        assert_eq!(
            bag.declaration().unwrap().version.as_deref(),
            Some("1.0")
        );
        assert_eq!(bag.tag_values("Source-Organization"), vec!["State Archive"]);

        let manifest = bag.manifest(ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.entries[0].path, "data/a.txt");
        assert_eq!(manifest.entries[0].checksum, "aaaa");
    }

    #[test]
    fn test_missing_declaration_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/x.txt", "x");

        let bag = Bag::open(dir.path()).unwrap();
        assert!(bag.declaration().is_none());
        assert!(bag.manifests().is_empty());
    }

    #[test]
    fn test_unreadable_root_is_io_error() {
        let err = Bag::open("/nonexistent/bag").unwrap_err();
        assert!(matches!(err, BagvetError::Io { .. }));
    }

    #[test]
    fn test_unknown_manifest_algorithm_recorded() {
        let dir = tempfile::tempdir().unwrap();
        minimal_bag(dir.path());
        write(dir.path(), "manifest-crc32.txt", "deadbeef  data/a.txt\n");

        let bag = Bag::open(dir.path()).unwrap();
        assert_eq!(bag.unknown_manifest_algorithms(), ["crc32"]);
        assert!(bag.manifest(ChecksumAlgorithm::Sha256).is_some());
    }

    #[test]
    fn test_payload_files_sorted_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        minimal_bag(dir.path());

        let bag = Bag::open(dir.path()).unwrap();
        let files = bag.payload_files().unwrap();
        let relative: Vec<String> = files.iter().map(|f| bag.relative_path(f)).collect();
        assert_eq!(relative, ["data/a.txt", "data/sub/b.txt"]);
    }

    #[test]
    fn test_tag_continuation_lines_fold() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bag-info.txt",
            "External-Description: first part\n  second part\n",
        );
        write(dir.path(), "data/.keep", "");

        let bag = Bag::open(dir.path()).unwrap();
        assert_eq!(
            bag.tag_values("External-Description"),
            vec!["first part second part"]
        );
    }

    #[test]
    fn test_repeated_tags_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bag-info.txt",
            "Contact-Name: a\nContact-Name: b\n",
        );

        let bag = Bag::open(dir.path()).unwrap();
        assert_eq!(bag.tag_values("Contact-Name"), vec!["a", "b"]);
    }

    #[test]
    fn test_payload_oxum_parsing() {
        assert_eq!(
            PayloadOxum::parse("11.2"),
            Some(PayloadOxum {
                octet_count: 11,
                stream_count: 2
            })
        );
        assert_eq!(PayloadOxum::parse("eleven.two"), None);
        assert_eq!(PayloadOxum::parse("11"), None);
    }

    #[test]
    fn test_manifest_path_escapes_decoded() {
        assert_eq!(decode_manifest_path("data/a%25b.txt"), "data/a%b.txt");
    }

    #[test]
    fn test_resolve_round_trips_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        minimal_bag(dir.path());
        let bag = Bag::open(dir.path()).unwrap();
        let resolved = bag.resolve("data/sub/b.txt");
        assert!(resolved.is_file());
        assert_eq!(bag.relative_path(&resolved), "data/sub/b.txt");
    }
}
