//! Compression-fallback retrieval: one glob fetch, then probe the working
//! directory for each candidate suffix in priority order.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::Compression;
use crate::error::GnssError;
use crate::fs_util;
use crate::resolver::Resolution;
use crate::store::Store;
use crate::tools::{Decompressor, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fetched {
    /// Decompressed file under its intermediate name.
    pub path: Utf8PathBuf,
    /// Suffix of the artifact that was decompressed; `None` for uncompressed
    /// files and reused intermediates.
    pub used_suffix: Compression,
    /// True when a leftover intermediate from an earlier run was used and
    /// nothing was downloaded.
    pub reused: bool,
}

/// Whether an intermediate already sitting in the working directory may stand
/// in for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leftover {
    /// Convert it instead of downloading; only safe when the intermediate can
    /// only have come from this resolution's archive.
    Reuse,
    /// Always download; a fresh artifact replaces whatever is there.
    Replace,
}

pub fn fetch_with_fallback(
    fetcher: &dyn Fetcher,
    decompressor: &dyn Decompressor,
    resolution: &Resolution,
    work_dir: &Utf8Path,
    leftover: Leftover,
) -> Result<Fetched, GnssError> {
    let names = &resolution.names;
    let intermediate = work_dir.join(&names.intermediate_name);
    if leftover == Leftover::Reuse
        && names.requires_conversion()
        && Store::exists_after(&intermediate)
    {
        debug!(path = %intermediate, "reusing intermediate from an earlier run");
        return Ok(Fetched {
            path: intermediate,
            used_suffix: Compression::None,
            reused: true,
        });
    }

    let remote = resolution.remote_file();
    if let Err(err) = fetcher.fetch(&remote, work_dir) {
        warn!(url = %remote.url(), error = %err, "fetch reported an error");
    }

    let mut landed = None;
    for compression in &names.candidates {
        let pattern = format!("{}{}", names.remote_stem, compression.suffix());
        if let Some(path) = fs_util::matching_files(work_dir, &pattern)?.into_iter().next() {
            landed = Some((path, *compression));
            break;
        }
    }
    let Some((artifact, used_suffix)) = landed else {
        return Err(GnssError::FetchFailed {
            url: resolution.requested_url(),
            pattern: names.remote_pattern(),
        });
    };

    let decompressed = decompressor.decompress(&artifact)?;
    if !Store::exists_after(&decompressed) {
        return Err(GnssError::ToolFailed {
            tool: "decompress".to_string(),
            message: format!("{artifact} produced no output"),
        });
    }
    remove_compressed_siblings(work_dir, &names.remote_stem, &names.candidates)?;

    if decompressed != intermediate {
        fs::rename(decompressed.as_std_path(), intermediate.as_std_path()).map_err(|err| {
            GnssError::Filesystem(format!("rename {decompressed} -> {intermediate}: {err}"))
        })?;
    }
    Ok(Fetched {
        path: intermediate,
        used_suffix,
        reused: false,
    })
}

/// Drops other compressed copies of the same file that the glob fetch may
/// have pulled in alongside the one that was decompressed.
fn remove_compressed_siblings(
    work_dir: &Utf8Path,
    stem: &str,
    candidates: &[Compression],
) -> Result<(), GnssError> {
    for compression in candidates.iter().filter(|c| c.is_compressed()) {
        let pattern = format!("{stem}{}", compression.suffix());
        for stray in fs_util::matching_files(work_dir, &pattern)? {
            debug!(path = %stray, "removing stray compressed artifact");
            fs_util::remove_if_exists(&stray)?;
        }
    }
    Ok(())
}
