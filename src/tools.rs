//! External collaborators: network transfer, decompression and Hatanaka
//! conversion. Each sits behind a narrow trait so the engine can be driven by
//! mocks in tests.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::Compression;
use crate::error::GnssError;
use crate::fs_util;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One remote file as handed to a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub url_dir: String,
    /// Remote name without compression suffix; may contain `*`.
    pub stem: String,
    pub candidates: Vec<Compression>,
    pub cut_dirs: usize,
}

impl RemoteFile {
    pub fn pattern(&self) -> String {
        if self.candidates.iter().any(Compression::is_compressed) {
            format!("{}.*", self.stem)
        } else {
            self.stem.clone()
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.url_dir, self.pattern())
    }

    pub fn has_wildcard(&self) -> bool {
        self.stem.contains('*') || self.stem.contains('?')
    }

    /// Concrete URLs in probe order; only meaningful without wildcards.
    pub fn candidate_urls(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|compression| format!("{}{}{}", self.url_dir, self.stem, compression.suffix()))
            .collect()
    }

    fn is_ftp(&self) -> bool {
        self.url_dir.starts_with("ftp://") || self.url_dir.starts_with("ftps://")
    }
}

pub trait Fetcher: Send + Sync {
    /// Best-effort retrieval of everything matching `remote` into `work_dir`.
    /// Callers judge success by what lands on disk, not by the return value.
    fn fetch(&self, remote: &RemoteFile, work_dir: &Utf8Path) -> Result<(), GnssError>;
}

pub trait Decompressor: Send + Sync {
    /// Replaces `path` by its decompressed sibling (suffix stripped) and
    /// returns the new path.
    fn decompress(&self, path: &Utf8Path) -> Result<Utf8PathBuf, GnssError>;
}

pub trait Converter: Send + Sync {
    fn convert(&self, input: &Utf8Path, output: &Utf8Path) -> Result<(), GnssError>;
}

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub wget: Option<Utf8PathBuf>,
    pub gzip: Option<Utf8PathBuf>,
    pub crx2rnx: Option<Utf8PathBuf>,
    pub timeout: Duration,
    pub verbose: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            wget: None,
            gzip: None,
            crx2rnx: None,
            timeout: DEFAULT_TOOL_TIMEOUT,
            verbose: false,
        }
    }
}

/// Explicit path when configured, otherwise the first match on `PATH`.
pub fn locate_tool(configured: Option<&Utf8Path>, name: &str) -> Result<Utf8PathBuf, GnssError> {
    if let Some(path) = configured {
        if path.as_std_path().is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(GnssError::MissingTool(format!("{name} at {path}")));
    }
    find_in_path(name).ok_or_else(|| GnssError::MissingTool(name.to_string()))
}

pub fn find_in_path(name: &str) -> Option<Utf8PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Utf8PathBuf::from_path_buf(exe).ok();
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Utf8PathBuf::from_path_buf(plain).ok();
        }
    }
    None
}

#[derive(Debug)]
pub struct ToolExit {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Runs `command` to completion or kills it once `timeout` has elapsed.
/// Stderr is spooled to an anonymous temp file so a chatty child can never
/// block on a full pipe.
pub fn run_with_timeout(
    tool: &str,
    mut command: Command,
    timeout: Duration,
) -> Result<ToolExit, GnssError> {
    let mut spool = tempfile::tempfile().map_err(|err| GnssError::Filesystem(err.to_string()))?;
    let stderr = spool
        .try_clone()
        .map_err(|err| GnssError::Filesystem(err.to_string()))?;
    command.stderr(Stdio::from(stderr));
    debug!(tool, command = ?command, "running external tool");

    let mut child = command.spawn().map_err(|err| GnssError::ToolFailed {
        tool: tool.to_string(),
        message: err.to_string(),
    })?;
    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GnssError::ToolTimeout {
                    tool: tool.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                return Err(GnssError::ToolFailed {
                    tool: tool.to_string(),
                    message: err.to_string(),
                });
            }
        }
    };

    let mut captured = Vec::new();
    spool
        .seek(SeekFrom::Start(0))
        .and_then(|_| spool.read_to_end(&mut captured))
        .map_err(|err| GnssError::Filesystem(err.to_string()))?;
    Ok(ToolExit {
        status,
        stderr: String::from_utf8_lossy(&captured).trim().to_string(),
    })
}

fn tool_failure(tool: &str, exit: &ToolExit) -> GnssError {
    let message = if exit.stderr.is_empty() {
        format!("exited with {}", exit.status)
    } else {
        exit.stderr.clone()
    };
    GnssError::ToolFailed {
        tool: tool.to_string(),
        message,
    }
}

#[derive(Debug, Clone)]
pub struct WgetFetcher {
    program: Utf8PathBuf,
    timeout: Duration,
    verbose: bool,
}

impl WgetFetcher {
    pub fn new(settings: &ToolSettings) -> Result<Self, GnssError> {
        Ok(Self {
            program: locate_tool(settings.wget.as_deref(), "wget")?,
            timeout: settings.timeout,
            verbose: settings.verbose,
        })
    }

    fn args(&self, remote: &RemoteFile) -> Vec<String> {
        let mut args = vec![
            (if self.verbose { "-nv" } else { "-q" }).to_string(),
            "-nc".to_string(),
            "-t".to_string(),
            "3".to_string(),
        ];
        if remote.is_ftp() {
            // FTP listings support globbing directly in the URL.
            args.push("-nH".to_string());
            args.push(format!("--cut-dirs={}", remote.cut_dirs));
            args.push(remote.url());
        } else if remote.has_wildcard() {
            args.extend(
                ["-r", "-l1", "-nd", "-np", "-A"]
                    .into_iter()
                    .map(str::to_string),
            );
            args.push(remote.pattern());
            args.push(remote.url_dir.clone());
        } else {
            args.extend(remote.candidate_urls());
        }
        args
    }
}

impl Fetcher for WgetFetcher {
    fn fetch(&self, remote: &RemoteFile, work_dir: &Utf8Path) -> Result<(), GnssError> {
        let mut command = Command::new(self.program.as_std_path());
        command
            .args(self.args(remote))
            .current_dir(work_dir.as_std_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        let exit = run_with_timeout("wget", command, self.timeout)?;
        if !exit.status.success() {
            // Glob misses and partially missing candidate lists exit non-zero;
            // the caller decides by probing the directory.
            warn!(url = %remote.url(), status = %exit.status, "wget reported failure");
        }
        Ok(())
    }
}

/// `.gz` in process, `.Z` through the external `gzip`.
#[derive(Debug, Clone)]
pub struct NativeDecompressor {
    gzip: Option<GzipToolDecompressor>,
}

impl NativeDecompressor {
    /// A missing `gzip` only matters once a `.Z` file shows up.
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            gzip: GzipToolDecompressor::new(settings).ok(),
        }
    }

    fn gunzip(path: &Utf8Path, output: &Utf8Path) -> Result<(), GnssError> {
        let input = File::open(path.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("open {path}: {err}")))?;
        let mut decoder = MultiGzDecoder::new(BufReader::new(input));
        let file = File::create(output.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("create {output}: {err}")))?;
        let mut writer = BufWriter::new(file);
        if let Err(err) = io::copy(&mut decoder, &mut writer) {
            drop(writer);
            let _ = fs::remove_file(output.as_std_path());
            return Err(GnssError::ToolFailed {
                tool: "gunzip".to_string(),
                message: format!("{path}: {err}"),
            });
        }
        Ok(())
    }
}

impl Decompressor for NativeDecompressor {
    fn decompress(&self, path: &Utf8Path) -> Result<Utf8PathBuf, GnssError> {
        match compression_of(path) {
            Compression::Gzip => {
                let output = strip_suffix(path)?;
                Self::gunzip(path, &output)?;
                fs_util::remove_if_exists(path)?;
                Ok(output)
            }
            Compression::Compress => match &self.gzip {
                Some(gzip) => gzip.decompress(path),
                None => Err(GnssError::MissingTool("gzip".to_string())),
            },
            Compression::None => Ok(path.to_path_buf()),
        }
    }
}

/// Everything through `gzip -d -f`, which also reads the LZW `.Z` format.
#[derive(Debug, Clone)]
pub struct GzipToolDecompressor {
    program: Utf8PathBuf,
    timeout: Duration,
}

impl GzipToolDecompressor {
    pub fn new(settings: &ToolSettings) -> Result<Self, GnssError> {
        Ok(Self {
            program: locate_tool(settings.gzip.as_deref(), "gzip")?,
            timeout: settings.timeout,
        })
    }
}

impl Decompressor for GzipToolDecompressor {
    fn decompress(&self, path: &Utf8Path) -> Result<Utf8PathBuf, GnssError> {
        if !compression_of(path).is_compressed() {
            return Ok(path.to_path_buf());
        }
        let output = strip_suffix(path)?;
        let mut command = Command::new(self.program.as_std_path());
        command
            .args(["-d", "-f"])
            .arg(path.as_std_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        let exit = run_with_timeout("gzip", command, self.timeout)?;
        if !exit.status.success() {
            return Err(tool_failure("gzip", &exit));
        }
        Ok(output)
    }
}

/// Hatanaka decompression through `crx2rnx`. A missing binary is reported
/// on first use, so runs without observations never need it.
#[derive(Debug, Clone)]
pub struct Crx2RnxConverter {
    program: Option<Utf8PathBuf>,
    timeout: Duration,
}

impl Crx2RnxConverter {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            program: locate_tool(settings.crx2rnx.as_deref(), "crx2rnx").ok(),
            timeout: settings.timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }
}

impl Converter for Crx2RnxConverter {
    fn convert(&self, input: &Utf8Path, output: &Utf8Path) -> Result<(), GnssError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| GnssError::MissingTool("crx2rnx".to_string()))?;
        let source = File::open(input.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("open {input}: {err}")))?;
        let sink = File::create(output.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("create {output}: {err}")))?;
        let mut command = Command::new(program.as_std_path());
        command
            .arg("-")
            .stdin(Stdio::from(source))
            .stdout(Stdio::from(sink));
        let exit = run_with_timeout("crx2rnx", command, self.timeout)?;
        if !exit.status.success() {
            return Err(tool_failure("crx2rnx", &exit));
        }
        Ok(())
    }
}

pub fn compression_of(path: &Utf8Path) -> Compression {
    match path.extension() {
        Some("gz") => Compression::Gzip,
        Some("Z") => Compression::Compress,
        _ => Compression::None,
    }
}

fn strip_suffix(path: &Utf8Path) -> Result<Utf8PathBuf, GnssError> {
    let name = fs_util::file_name(path)?;
    let suffix = compression_of(path).suffix();
    let stripped = name.strip_suffix(suffix).unwrap_or(name);
    Ok(path.with_file_name(stripped))
}
