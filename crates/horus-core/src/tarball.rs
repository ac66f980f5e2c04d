//! Artifact construction.
//!
//! Both ingestion paths (remote clone and uploaded archive) prepare a
//! scratch directory and funnel into [`compress`], which produces the
//! canonical gzip'd tar artifact and its SHA-256 content hash in a single
//! pass. The scratch directory is removed on every exit path.

use std::{
    fs,
    io::{Read, Write},
    path::Path,
    process::Stdio,
};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use horus_config::Config;
use horus_utils::hash::HashingWriter;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    constants::{HORUS_SUBDIR, MANIFEST_FILE},
    error::{ErrorContext, HorusError},
    manifest::Manifest,
    HorusResult,
};

/// A compressed package artifact ready for publishing.
#[derive(Debug)]
pub struct BuiltTarball {
    /// The gzip'd tar bytes.
    pub data: Vec<u8>,
    /// Lowercase hex SHA-256 digest of `data`.
    pub hash: String,
    /// The manifest found inside the package.
    pub manifest: Manifest,
}

fn scratch_dir(config: &Config) -> HorusResult<TempDir> {
    let base = config.tmp_dir();
    horus_utils::fs::ensure_dir_exists(&base)?;
    tempfile::Builder::new()
        .prefix("horus-")
        .tempdir_in(&base)
        .with_context(|| "creating build directory".to_string())
}

/// Clones a git repository and builds its artifact.
///
/// The package is either the repository itself (manifest at the root) or a
/// `.horus` subdirectory containing the manifest; the subdirectory wins
/// when both exist.
pub async fn build_from_git(url: &str, config: &Config) -> HorusResult<BuiltTarball> {
    let workdir = scratch_dir(config)?;

    let status = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(workdir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| "running git clone".to_string())?;

    if !status.success() {
        // workdir guard removes the partial clone
        return Err(HorusError::CloneFailed(url.to_string()));
    }

    let subdir = workdir.path().join(HORUS_SUBDIR);
    let result = if let Some(manifest) = Manifest::read(&subdir.join(MANIFEST_FILE)) {
        compress(&subdir, manifest, config)
    } else if let Some(manifest) = Manifest::read(&workdir.path().join(MANIFEST_FILE)) {
        compress(workdir.path(), manifest, config)
    } else {
        Err(HorusError::MissingManifest(format!(
            "Repository does not contain a valid {MANIFEST_FILE} file (checked {HORUS_SUBDIR}/{MANIFEST_FILE} and {MANIFEST_FILE})"
        )))
    };

    cleanup(workdir);
    result
}

/// Extracts an uploaded gzip'd tar stream and builds its artifact.
///
/// Uploads must carry the manifest at the archive root; the `.horus`
/// subdirectory convention applies to repositories only.
pub fn build_from_archive<R: Read>(stream: R, config: &Config) -> HorusResult<BuiltTarball> {
    let workdir = scratch_dir(config)?;

    let decoder = GzDecoder::new(stream);
    let mut archive = tar::Archive::new(decoder);
    if let Err(err) = archive.unpack(workdir.path()) {
        cleanup(workdir);
        return Err(HorusError::IoError {
            action: "extracting upload archive".to_string(),
            source: err,
        });
    }

    let result = match Manifest::read(&workdir.path().join(MANIFEST_FILE)) {
        Some(manifest) => compress(workdir.path(), manifest, config),
        None => Err(HorusError::MissingManifest(format!(
            "Archive does not contain a valid {MANIFEST_FILE} file at its root"
        ))),
    };

    cleanup(workdir);
    result
}

fn cleanup(workdir: TempDir) {
    if let Err(err) = workdir.close() {
        warn!("failed to remove build directory: {err}");
    }
}

/// Compresses a package directory into a deterministic gzip'd tar stream,
/// hashing the compressed bytes as they are produced.
///
/// Entries are added in sorted order so identical directory contents yield
/// an identical artifact and hash. Artifacts larger than the configured
/// ceiling are rejected with [`HorusError::TooLarge`].
pub fn compress(dir: &Path, manifest: Manifest, config: &Config) -> HorusResult<BuiltTarball> {
    let writer = HashingWriter::new(Vec::new());
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    append_dir_sorted(&mut builder, dir, Path::new(""))?;

    let encoder = builder
        .into_inner()
        .with_context(|| "finalizing tar stream".to_string())?;
    let writer = encoder
        .finish()
        .with_context(|| "finalizing gzip stream".to_string())?;
    let (data, hash) = writer.finish();

    if data.len() as u64 > config.max_tarball_size {
        return Err(HorusError::TooLarge {
            limit: config.max_tarball_size,
        });
    }

    debug!(size = data.len(), %hash, "built package artifact");
    Ok(BuiltTarball {
        data,
        hash,
        manifest,
    })
}

fn append_dir_sorted<W: Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    rel: &Path,
) -> HorusResult<()> {
    let dir = root.join(rel);
    let mut entries = fs::read_dir(&dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading directory {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let rel_path = rel.join(entry.file_name());
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspecting {}", path.display()))?;

        if file_type.is_dir() {
            builder
                .append_dir(&rel_path, &path)
                .with_context(|| format!("archiving {}", path.display()))?;
            append_dir_sorted(builder, root, &rel_path)?;
        } else {
            builder
                .append_path_with_name(&path, &rel_path)
                .with_context(|| format!("archiving {}", path.display()))?;
        }
    }

    Ok(())
}
