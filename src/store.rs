use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::domain::{ProductCategory, ProductRequest};
use crate::error::GnssError;
use crate::resolver::NameSet;

/// Local tree that receives canonical deliverables.
///
/// Layout: `<root>/<category>/<yyyy>/<ddd>[/<hh>][/<mm>]` for day-keyed data,
/// `<root>/<category>/<wwww>` for weekly product trees and `<root>/atx` for
/// antenna models.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn default_root() -> Result<Utf8PathBuf, GnssError> {
        BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join("gnss-data")).ok())
            .ok_or_else(|| GnssError::Filesystem("unable to resolve home directory".to_string()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn deliverable_dir(&self, request: &ProductRequest) -> Utf8PathBuf {
        let epoch = &request.epoch;
        let base = self.root.join(request.category.dir_name());
        match request.category {
            ProductCategory::AntennaExchange => base,
            ProductCategory::PreciseOrbit
            | ProductCategory::PreciseClock
            | ProductCategory::EarthOrientation
            | ProductCategory::AttitudeExchange
            | ProductCategory::BiasDsb
            | ProductCategory::BiasOsb
            | ProductCategory::Sinex => base.join(format!("{:04}", epoch.gps_week())),
            _ => {
                let mut dir = base
                    .join(format!("{:04}", epoch.year()))
                    .join(format!("{:03}", epoch.doy()));
                if let Some(hour) = epoch.hour() {
                    dir.push(format!("{hour:02}"));
                }
                if let Some(minute) = epoch.minute() {
                    dir.push(format!("{minute:02}"));
                }
                dir
            }
        }
    }

    pub fn ensure_dir(dir: &Utf8Path) -> Result<(), GnssError> {
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("create {dir}: {err}")))
    }

    pub fn canonical_path(dir: &Utf8Path, names: &NameSet) -> Utf8PathBuf {
        dir.join(&names.canonical_local_name)
    }

    /// Only the canonical deliverable counts; intermediates and compressed
    /// leftovers never satisfy a request.
    pub fn already_satisfied(dir: &Utf8Path, names: &NameSet) -> bool {
        Self::exists_after(&Self::canonical_path(dir, names))
    }

    /// Success check used after every external step, whose exit codes are
    /// not trusted.
    pub fn exists_after(path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GnssError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
