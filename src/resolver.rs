//! Deterministic naming: turns a [`ProductRequest`] into the remote directory,
//! the remote filename pattern and the local names it will pass through.
//!
//! The resolver never touches the network or disk; every rule is a pure
//! function of the request and the catalog.

use serde::Serialize;

use crate::catalog::{ArchiveCatalog, ArchiveRoute, Layout};
use crate::domain::{
    Archive, CenterCode, Compression, DcbPair, NavSystem, ProductCategory, ProductLine,
    ProductRequest, SiteCode, Subject,
};
use crate::epoch::{Epoch, hour_letter};
use crate::error::GnssError;
use crate::tools::RemoteFile;

/// First GPS week in which IGS products are published under long names only.
pub const LONG_NAME_WEEK: u32 = 2238;

/// First year whose mixed broadcast navigation lives in the regular daily tree.
pub const MIXED_NAV_LAYOUT_YEAR: i32 = 2020;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameSet {
    /// Decompressed remote filename; `*` stands for fields that cannot be
    /// predicted, such as the country code of a long observation name.
    pub remote_stem: String,
    /// Name the file carries after decompression and optional rename, before
    /// any format conversion.
    pub intermediate_name: String,
    pub canonical_local_name: String,
    /// Compression suffixes to probe, most likely first.
    pub candidates: Vec<Compression>,
}

impl NameSet {
    /// Glob handed to the fetch tool.
    pub fn remote_pattern(&self) -> String {
        if self.candidates.iter().any(Compression::is_compressed) {
            format!("{}.*", self.remote_stem)
        } else {
            self.remote_stem.clone()
        }
    }

    pub fn requires_conversion(&self) -> bool {
        self.intermediate_name != self.canonical_local_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub archive: Archive,
    pub url_dir: String,
    pub cut_dirs: usize,
    pub names: NameSet,
}

impl Resolution {
    pub fn requested_url(&self) -> String {
        format!("{}{}", self.url_dir, self.names.remote_pattern())
    }

    pub fn remote_file(&self) -> RemoteFile {
        RemoteFile {
            url_dir: self.url_dir.clone(),
            stem: self.names.remote_stem.clone(),
            candidates: self.names.candidates.clone(),
            cut_dirs: self.cut_dirs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameStyle {
    Short,
    Long,
    Plain,
}

#[derive(Debug)]
struct Naming {
    remote_stem: String,
    intermediate_name: String,
    canonical_local_name: String,
    style: NameStyle,
    layout: Layout,
    file_type: Option<char>,
}

impl Naming {
    fn short(name: String) -> Self {
        Self {
            remote_stem: name.clone(),
            intermediate_name: name.clone(),
            canonical_local_name: name,
            style: NameStyle::Short,
            layout: Layout::Current,
            file_type: None,
        }
    }

    /// Remote long name renamed to `canonical` after decompression.
    fn long(remote_stem: String, canonical: String) -> Self {
        Self {
            remote_stem,
            intermediate_name: canonical.clone(),
            canonical_local_name: canonical,
            style: NameStyle::Long,
            layout: Layout::Current,
            file_type: None,
        }
    }

    /// Long name in the long-name era, the short canonical name before it.
    fn by_era(long_era: bool, long_stem: impl FnOnce() -> String, canonical: String) -> Self {
        if long_era {
            Self::long(long_stem(), canonical)
        } else {
            Self::short(canonical)
        }
    }

    fn with_type(mut self, file_type: char) -> Self {
        self.file_type = Some(file_type);
        self
    }
}

pub fn resolve(catalog: &ArchiveCatalog, request: &ProductRequest) -> Result<Resolution, GnssError> {
    let naming = match request.category {
        ProductCategory::ObservationDaily
        | ProductCategory::ObservationHourly
        | ProductCategory::ObservationHighrate => observation(request)?,
        ProductCategory::BroadcastEphemeris => navigation(request)?,
        ProductCategory::PreciseOrbit
        | ProductCategory::PreciseClock
        | ProductCategory::EarthOrientation => precise(request)?,
        ProductCategory::AttitudeExchange | ProductCategory::BiasOsb => mgex_product(request)?,
        ProductCategory::BiasDsb => code_bias(request)?,
        ProductCategory::Sinex => sinex(request)?,
        ProductCategory::IonosphereMap => ionosphere(request)?,
        ProductCategory::Roti => roti(request)?,
        ProductCategory::Troposphere => troposphere(request)?,
        ProductCategory::AntennaExchange => antenna(request)?,
    };

    let route = catalog.layout_route(request.archive, request.category, naming.layout)?;
    let url_dir = expand(route, request, naming.file_type)?;
    let candidates = match naming.style {
        NameStyle::Plain => vec![Compression::None],
        NameStyle::Long => vec![Compression::Gzip, Compression::Compress],
        NameStyle::Short if route.gzip_first => vec![Compression::Gzip, Compression::Compress],
        NameStyle::Short => vec![Compression::Compress, Compression::Gzip],
    };

    Ok(Resolution {
        archive: request.archive,
        url_dir,
        cut_dirs: route.cut_dirs,
        names: NameSet {
            remote_stem: naming.remote_stem,
            intermediate_name: naming.intermediate_name,
            canonical_local_name: naming.canonical_local_name,
            candidates,
        },
    })
}

fn expand(
    route: &ArchiveRoute,
    request: &ProductRequest,
    file_type: Option<char>,
) -> Result<String, GnssError> {
    let epoch = &request.epoch;
    let mut url = route
        .base_url
        .replace("{yyyy}", &format!("{:04}", epoch.year()))
        .replace("{yy}", &format!("{:02}", epoch.yy()))
        .replace("{ddd}", &format!("{:03}", epoch.doy()))
        .replace("{wwww}", &format!("{:04}", epoch.gps_week()))
        .replace("{hh}", &format!("{:02}", epoch.hour().unwrap_or(0)));
    if url.contains("{site}") {
        let site = request
            .site()
            .ok_or_else(|| unsupported(request, "archive directory is keyed by site"))?;
        url = url.replace("{site}", site.as_str());
    }
    if url.contains("{type}") {
        let file_type =
            file_type.ok_or_else(|| unsupported(request, "no file type for this directory"))?;
        url = url.replace("{type}", &file_type.to_string());
    }
    Ok(url)
}

fn unsupported(request: &ProductRequest, detail: impl Into<String>) -> GnssError {
    GnssError::UnsupportedCombination {
        category: request.category,
        archive: request.archive,
        detail: detail.into(),
    }
}

fn required_site(request: &ProductRequest) -> Result<&SiteCode, GnssError> {
    request
        .site()
        .ok_or_else(|| unsupported(request, "a site code is required"))
}

fn is_long_era(epoch: &Epoch) -> bool {
    epoch.gps_week() >= LONG_NAME_WEEK
}

/// `{yyyy}{ddd}` of an epoch, the date field of long names.
fn long_date(epoch: &Epoch) -> String {
    format!("{:04}{:03}", epoch.year(), epoch.doy())
}

/// `{wwww}{d}` of an epoch, the date field of short product names.
fn week_day(epoch: &Epoch) -> String {
    format!("{:04}{}", epoch.gps_week(), epoch.day_of_week())
}

fn observation(request: &ProductRequest) -> Result<Naming, GnssError> {
    let site = required_site(request)?;
    let epoch = &request.epoch;
    let (session, start, span, rate) = match request.category {
        ProductCategory::ObservationHourly => {
            let hour = epoch
                .hour()
                .ok_or_else(|| unsupported(request, "hourly files need an hour"))?;
            let letter = hour_letter(hour)?;
            (letter.to_string(), format!("{hour:02}00"), "01H", "30S")
        }
        ProductCategory::ObservationHighrate => {
            let hour = epoch
                .hour()
                .ok_or_else(|| unsupported(request, "high-rate files need an hour"))?;
            let minute = epoch.minute().unwrap_or(0);
            let letter = hour_letter(hour)?;
            (
                format!("{letter}{minute:02}"),
                format!("{hour:02}{minute:02}"),
                "15M",
                "01S",
            )
        }
        _ => ("0".to_string(), "0000".to_string(), "01D", "30S"),
    };

    let short = format!("{site}{:03}{session}.{:02}", epoch.doy(), epoch.yy());
    let intermediate = format!("{short}d");
    let canonical = format!("{short}o");
    let (remote_stem, style) = match request.archive {
        Archive::Igs | Archive::Ngs | Archive::Pbo2 => (intermediate.clone(), NameStyle::Short),
        Archive::Mgex | Archive::Cut | Archive::Ga | Archive::Hk | Archive::Epn | Archive::Pbo3 => (
            format!(
                "{}*_{}{start}_{span}_{rate}_MO.crx",
                site.upper(),
                long_date(epoch)
            ),
            NameStyle::Long,
        ),
        _ => return Err(unsupported(request, "archive does not serve observations")),
    };
    Ok(Naming {
        remote_stem,
        intermediate_name: intermediate,
        canonical_local_name: canonical,
        style,
        layout: Layout::Current,
        file_type: None,
    })
}

fn navigation(request: &ProductRequest) -> Result<Naming, GnssError> {
    if let Some(hour) = request.epoch.hour() {
        return hourly_navigation(request, hour);
    }
    let epoch = &request.epoch;
    let system = request.nav_system.unwrap_or(NavSystem::Mixed);
    let ddd = epoch.doy();
    let yy = epoch.yy();

    match (&request.subject, request.archive) {
        (Subject::Site(site), Archive::Igs)
            if matches!(system, NavSystem::Gps | NavSystem::Glonass) =>
        {
            let t = system.short_type();
            Ok(Naming::short(format!("{site}{ddd:03}0.{yy:02}{t}")).with_type(t))
        }
        (Subject::Site(site), Archive::Mgex) => {
            let remote = format!(
                "{}*_{}0000_01D_{}.rnx",
                site.upper(),
                long_date(epoch),
                system.long_type()
            );
            let canonical = format!("{site}{ddd:03}0.{yy:02}{}", system.short_type());
            Ok(Naming::long(remote, canonical).with_type('p'))
        }
        (Subject::Center(center), Archive::Igs) if center.line == ProductLine::Final => {
            match system {
                NavSystem::Gps | NavSystem::Glonass if center.code == CenterCode::Igs => {
                    let t = system.short_type();
                    Ok(Naming::short(format!("brdc{ddd:03}0.{yy:02}{t}")).with_type(t))
                }
                NavSystem::Mixed => mixed_navigation(request, center.code),
                _ => Err(unsupported(
                    request,
                    format!("no broadcast {system:?} file from {center}"),
                )),
            }
        }
        _ => Err(unsupported(request, "no broadcast navigation rule")),
    }
}

/// One-hour site files from the hourly tree; canonical names carry the hour
/// letter in place of the daily session `0`.
fn hourly_navigation(request: &ProductRequest, hour: u32) -> Result<Naming, GnssError> {
    let epoch = &request.epoch;
    let system = request.nav_system.unwrap_or(NavSystem::Mixed);
    let site = request
        .site()
        .ok_or_else(|| unsupported(request, "hourly navigation is only published per site"))?;
    let letter = hour_letter(hour)?;
    let t = system.short_type();
    let canonical = format!("{site}{:03}{letter}.{:02}{t}", epoch.doy(), epoch.yy());

    let naming = match request.archive {
        Archive::Igs if matches!(system, NavSystem::Gps | NavSystem::Glonass) => {
            Naming::short(canonical)
        }
        Archive::Mgex => Naming::long(
            format!(
                "{}*_{}{hour:02}00_01H_{}.rnx",
                site.upper(),
                long_date(epoch),
                system.long_type()
            ),
            canonical,
        ),
        _ => {
            return Err(unsupported(
                request,
                format!("no hourly {system:?} navigation rule"),
            ));
        }
    };
    Ok(Naming {
        layout: Layout::Hourly,
        ..naming
    })
}

fn mixed_navigation(request: &ProductRequest, code: CenterCode) -> Result<Naming, GnssError> {
    let epoch = &request.epoch;
    let prefix = match code {
        CenterCode::Igs => "brdm".to_string(),
        CenterCode::Dlr | CenterCode::Ign | CenterCode::Gop | CenterCode::Wrd => {
            format!("{}m", code.as_str())
        }
        _ => return Err(unsupported(request, "center publishes no merged navigation")),
    };
    let canonical = format!("{prefix}{:03}0.{:02}p", epoch.doy(), epoch.yy());

    if epoch.year() >= MIXED_NAV_LAYOUT_YEAR {
        let remote = format!(
            "BRD*00{}_*_{}0000_01D_MN.rnx",
            code.upper(),
            long_date(epoch)
        );
        return Ok(Naming::long(remote, canonical).with_type('p'));
    }
    if !matches!(code, CenterCode::Igs | CenterCode::Dlr) {
        return Err(unsupported(
            request,
            format!("{} merged navigation starts in {MIXED_NAV_LAYOUT_YEAR}", code.as_str()),
        ));
    }
    Ok(Naming {
        layout: Layout::Legacy,
        ..Naming::short(canonical)
    })
}

/// `.sp3`/`.clk`/`.erp` extension and the matching long-name content field.
fn precise_extensions(category: ProductCategory) -> (&'static str, &'static str) {
    match category {
        ProductCategory::PreciseClock => ("clk", "CLK.CLK"),
        ProductCategory::EarthOrientation => ("erp", "ERP.ERP"),
        ProductCategory::AttitudeExchange => ("obx", "ATT.OBX"),
        ProductCategory::BiasOsb => ("bia", "OSB.BIA"),
        _ => ("sp3", "ORB.SP3"),
    }
}

fn precise(request: &ProductRequest) -> Result<Naming, GnssError> {
    let center = request
        .center()
        .ok_or_else(|| unsupported(request, "an analysis center is required"))?;
    let epoch = &request.epoch;
    let long_era = is_long_era(epoch);
    let (ext, content) = precise_extensions(request.category);
    let is_eop = request.category == ProductCategory::EarthOrientation;
    let code = center.code;

    match (request.archive, center.line) {
        (Archive::Igs, ProductLine::Final) => {
            if !matches!(
                code,
                CenterCode::Cod
                    | CenterCode::Emr
                    | CenterCode::Esa
                    | CenterCode::Gfz
                    | CenterCode::Grg
                    | CenterCode::Igs
                    | CenterCode::Jpl
                    | CenterCode::Mit
            ) {
                return Err(unsupported(request, format!("{center} has no final products")));
            }
            let ac = code.as_str();
            if is_eop {
                let week_start = epoch.week_start();
                let canonical = format!("{ac}{:04}7.erp", epoch.gps_week());
                return Ok(Naming::by_era(
                    long_era,
                    || {
                        format!(
                            "{}0OPSFIN_{}0000_07D_01D_ERP.ERP",
                            code.upper(),
                            long_date(&week_start)
                        )
                    },
                    canonical,
                ));
            }
            let canonical = format!("{ac}{}.{ext}", week_day(epoch));
            Ok(Naming::by_era(
                long_era,
                || {
                    format!(
                        "{}0OPSFIN_{}0000_01D_*_{content}",
                        code.upper(),
                        long_date(epoch)
                    )
                },
                canonical,
            ))
        }
        (Archive::Igs, ProductLine::Rapid) => {
            let short = match code {
                CenterCode::Igs => "igr",
                CenterCode::Cod => "cor",
                CenterCode::Esa => "esr",
                CenterCode::Gfz => "gfr",
                _ => return Err(unsupported(request, format!("{center} has no rapid products"))),
            };
            if !long_era && code != CenterCode::Igs {
                return Err(unsupported(
                    request,
                    format!("{center} rapid products start in GPS week {LONG_NAME_WEEK}"),
                ));
            }
            let canonical = format!("{short}{}.{ext}", week_day(epoch));
            let span = if is_eop { "01D" } else { "*" };
            Ok(Naming::by_era(
                long_era,
                || {
                    format!(
                        "{}0OPSRAP_{}0000_01D_{span}_{content}",
                        code.upper(),
                        long_date(epoch)
                    )
                },
                canonical,
            ))
        }
        (Archive::Igs, ProductLine::UltraRapid) => {
            let short = match code {
                CenterCode::Igs => "igu",
                CenterCode::Esa => "esu",
                CenterCode::Gfz => "gfu",
                _ => {
                    return Err(unsupported(
                        request,
                        format!("{center} ultra-rapid products are not mirrored"),
                    ));
                }
            };
            if request.category == ProductCategory::PreciseClock {
                return Err(unsupported(request, "ultra-rapid products carry no clock file"));
            }
            if is_eop && code != CenterCode::Igs {
                return Err(unsupported(request, format!("{center} has no ultra-rapid EOP")));
            }
            let hour = epoch.hour().unwrap_or(0);
            let step = center.session_step();
            if hour % step != 0 {
                return Err(unsupported(
                    request,
                    format!("hour {hour:02} is not a {center} session (every {step}h)"),
                ));
            }
            let canonical = format!("{short}{}_{hour:02}.{ext}", week_day(epoch));
            Ok(Naming::by_era(
                long_era,
                || {
                    format!(
                        "{}0OPSULT_{}{hour:02}00_02D_*_{content}",
                        code.upper(),
                        long_date(epoch)
                    )
                },
                canonical,
            ))
        }
        (Archive::Mgex, ProductLine::Mgex) if !is_eop => mgex_product(request),
        (Archive::Cnes, _) if !is_eop => mgex_product(request),
        _ => Err(unsupported(request, format!("no rule for {center}"))),
    }
}

/// Multi-GNSS products: MGEX long names, or CNES real-time short names.
fn mgex_product(request: &ProductRequest) -> Result<Naming, GnssError> {
    let center = request
        .center()
        .ok_or_else(|| unsupported(request, "an analysis center is required"))?;
    let epoch = &request.epoch;
    let (ext, content) = precise_extensions(request.category);

    match (request.archive, center.code, center.line) {
        (Archive::Cnes, CenterCode::Cnt, _) => {
            Ok(Naming::short(format!("cnt{}.{ext}", week_day(epoch))))
        }
        (Archive::Mgex, code, ProductLine::Mgex) => {
            let (prefix, short) = match code {
                CenterCode::Cod => ("COD0MGXFIN", "com"),
                CenterCode::Gfz => ("GFZ0MGXRAP", "gbm"),
                CenterCode::Grg => ("GRG0MGXFIN", "grm"),
                CenterCode::Whu => ("WUM0MGXFIN", "wum"),
                _ => {
                    return Err(unsupported(
                        request,
                        format!("{center} publishes no MGEX products"),
                    ));
                }
            };
            Ok(Naming::long(
                format!("{prefix}_{}0000_01D_*_{content}", long_date(epoch)),
                format!("{short}{}.{ext}", week_day(epoch)),
            ))
        }
        _ => Err(unsupported(request, format!("no rule for {center}"))),
    }
}

fn code_bias(request: &ProductRequest) -> Result<Naming, GnssError> {
    let center = request
        .center()
        .ok_or_else(|| unsupported(request, "an analysis center is required"))?;
    let epoch = &request.epoch;
    match (request.archive, center.code) {
        (Archive::Igs, CenterCode::Cas) => Ok(Naming::long(
            format!("CAS0MGXRAP_{}0000_01D_01D_DCB.BSX", long_date(epoch)),
            format!("cas{}.bsx", week_day(epoch)),
        )),
        (Archive::Code, CenterCode::Cod) => {
            let pair = request.dcb_pair.unwrap_or(DcbPair::P1P2);
            Ok(Naming::short(format!(
                "{pair}{:02}{:02}.DCB",
                epoch.yy(),
                epoch.month()
            )))
        }
        _ => Err(unsupported(
            request,
            format!("no code bias rule for {center} on {}", request.archive),
        )),
    }
}

fn sinex(request: &ProductRequest) -> Result<Naming, GnssError> {
    let is_igs = match request.subject {
        Subject::Global => true,
        Subject::Center(center) => center.code == CenterCode::Igs,
        Subject::Site(_) => false,
    };
    if request.archive != Archive::Igs || !is_igs {
        return Err(unsupported(request, "only the IGS weekly solution is served"));
    }
    let epoch = &request.epoch;
    let canonical = format!("igs{:02}P{:04}.snx", epoch.yy(), epoch.gps_week());
    let week_start = epoch.week_start();
    Ok(Naming::by_era(
        is_long_era(epoch),
        || format!("IGS0OPSSNX_{}0000_07D_07D_SOL.SNX", long_date(&week_start)),
        canonical,
    ))
}

fn ionosphere(request: &ProductRequest) -> Result<Naming, GnssError> {
    let center = request
        .center()
        .ok_or_else(|| unsupported(request, "an analysis center is required"))?;
    if request.archive != Archive::Igs {
        return Err(unsupported(request, "ionosphere maps come from the IGS archive"));
    }
    let epoch = &request.epoch;
    let code = center.code;
    let (canonical, line) = match center.line {
        ProductLine::Final
            if matches!(
                code,
                CenterCode::Cas
                    | CenterCode::Cod
                    | CenterCode::Emr
                    | CenterCode::Esa
                    | CenterCode::Igs
                    | CenterCode::Jpl
                    | CenterCode::Upc
            ) =>
        {
            (
                format!("{}g{:03}0.{:02}i", code.as_str(), epoch.doy(), epoch.yy()),
                "FIN",
            )
        }
        ProductLine::Rapid
            if matches!(
                code,
                CenterCode::Cas
                    | CenterCode::Cod
                    | CenterCode::Esa
                    | CenterCode::Igs
                    | CenterCode::Jpl
                    | CenterCode::Upc
            ) =>
        {
            let two = &code.as_str()[..2];
            (
                format!("{two}rg{:03}0.{:02}i", epoch.doy(), epoch.yy()),
                "RAP",
            )
        }
        _ => return Err(unsupported(request, format!("{center} publishes no GIM"))),
    };
    Ok(Naming::by_era(
        is_long_era(epoch),
        || {
            format!(
                "{}0OPS{line}_{}0000_01D_*_GIM.INX",
                code.upper(),
                long_date(epoch)
            )
        },
        canonical,
    ))
}

fn roti(request: &ProductRequest) -> Result<Naming, GnssError> {
    if request.archive != Archive::Igs || request.subject != Subject::Global {
        return Err(unsupported(request, "ROTI maps are a global IGS product"));
    }
    let epoch = &request.epoch;
    Ok(Naming::short(format!(
        "roti{:03}0.{:02}f",
        epoch.doy(),
        epoch.yy()
    )))
}

fn troposphere(request: &ProductRequest) -> Result<Naming, GnssError> {
    let epoch = &request.epoch;
    match (&request.subject, request.archive) {
        (Subject::Site(site), Archive::Igs) => {
            let canonical = format!("{site}{:03}0.{:02}zpd", epoch.doy(), epoch.yy());
            Ok(Naming::by_era(
                is_long_era(epoch),
                || {
                    format!(
                        "IGS0OPSFIN_{}0000_01D_05M_{}*_TRO.TRO",
                        long_date(epoch),
                        site.upper()
                    )
                },
                canonical,
            ))
        }
        (Subject::Center(center), Archive::Code) if center.code == CenterCode::Cod => {
            let day = week_day(epoch);
            Ok(Naming {
                remote_stem: format!("COD{day}.TRO"),
                ..Naming::short(format!("cod{day}.tro"))
            })
        }
        _ => Err(unsupported(request, "no troposphere rule")),
    }
}

fn antenna(request: &ProductRequest) -> Result<Naming, GnssError> {
    if request.archive != Archive::IgsCentral {
        return Err(unsupported(request, "antenna models come from the IGS central bureau"));
    }
    let name = if is_long_era(&request.epoch) {
        "igs20.atx"
    } else {
        "igs14.atx"
    };
    Ok(Naming {
        style: NameStyle::Plain,
        ..Naming::short(name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::{AnalysisCenter, Mirror};

    fn epoch(year: i32, doy: u32) -> Epoch {
        Epoch::from_year_doy(year, doy).unwrap()
    }

    fn site(code: &str) -> Subject {
        Subject::Site(code.parse().unwrap())
    }

    fn center(code: &str) -> Subject {
        Subject::Center(code.parse::<AnalysisCenter>().unwrap())
    }

    fn resolve_on(mirror: Mirror, request: &ProductRequest) -> Resolution {
        resolve(&ArchiveCatalog::new(mirror), request).unwrap()
    }

    #[test]
    fn daily_observation_from_igs_uses_short_names() {
        let request = ProductRequest::new(
            ProductCategory::ObservationDaily,
            epoch(2021, 6),
            site("abpo"),
            Archive::Igs,
        );
        let resolution = resolve_on(Mirror::Cddis, &request);
        assert_eq!(
            resolution.url_dir,
            "ftps://gdc.cddis.eosdis.nasa.gov/gnss/data/daily/2021/006/21d/"
        );
        assert_eq!(resolution.cut_dirs, 6);
        assert_eq!(resolution.names.remote_stem, "abpo0060.21d");
        assert_eq!(resolution.names.intermediate_name, "abpo0060.21d");
        assert_eq!(resolution.names.canonical_local_name, "abpo0060.21o");
        assert_eq!(resolution.names.remote_pattern(), "abpo0060.21d.*");
        assert!(resolution.names.requires_conversion());
        assert_eq!(
            resolution.names.candidates,
            vec![Compression::Gzip, Compression::Compress]
        );
    }

    #[test]
    fn ign_prefers_unix_compress_for_short_names() {
        let request = ProductRequest::new(
            ProductCategory::ObservationDaily,
            epoch(2021, 6),
            site("abpo"),
            Archive::Igs,
        );
        let resolution = resolve_on(Mirror::Ign, &request);
        assert_eq!(resolution.url_dir, "ftp://igs.ign.fr/pub/igs/data/2021/006/");
        assert_eq!(
            resolution.names.candidates,
            vec![Compression::Compress, Compression::Gzip]
        );
    }

    #[test]
    fn mgex_observation_uses_long_name_with_country_wildcard() {
        let request = ProductRequest::new(
            ProductCategory::ObservationDaily,
            epoch(2021, 6),
            site("abpo"),
            Archive::Mgex,
        );
        let names = resolve_on(Mirror::Cddis, &request).names;
        assert_eq!(names.remote_stem, "ABPO*_20210060000_01D_30S_MO.crx");
        assert_eq!(names.intermediate_name, "abpo0060.21d");
        assert_eq!(names.canonical_local_name, "abpo0060.21o");
    }

    #[test]
    fn hourly_and_highrate_sessions() {
        let at_five = epoch(2021, 6).with_hour(5).unwrap();
        let hourly = ProductRequest::new(
            ProductCategory::ObservationHourly,
            at_five,
            site("abpo"),
            Archive::Igs,
        );
        let resolution = resolve_on(Mirror::Cddis, &hourly);
        assert_eq!(resolution.names.remote_stem, "abpo006f.21d");
        assert!(resolution.url_dir.ends_with("/hourly/2021/006/05/"));

        let quarter = at_five.with_minute(30).unwrap();
        let highrate = ProductRequest::new(
            ProductCategory::ObservationHighrate,
            quarter,
            site("abpo"),
            Archive::Mgex,
        );
        let names = resolve_on(Mirror::Cddis, &highrate).names;
        assert_eq!(names.remote_stem, "ABPO*_20210060530_15M_01S_MO.crx");
        assert_eq!(names.canonical_local_name, "abpo006f30.21o");
    }

    #[test]
    fn hourly_without_hour_is_unsupported() {
        let request = ProductRequest::new(
            ProductCategory::ObservationHourly,
            epoch(2021, 6),
            site("abpo"),
            Archive::Igs,
        );
        let err = resolve(&ArchiveCatalog::new(Mirror::Cddis), &request).unwrap_err();
        assert_matches!(err, GnssError::UnsupportedCombination { .. });
    }

    #[test]
    fn site_keyed_directories_expand_site() {
        let request = ProductRequest::new(
            ProductCategory::ObservationDaily,
            epoch(2021, 6),
            site("hkcl"),
            Archive::Hk,
        );
        let resolution = resolve_on(Mirror::Cddis, &request);
        assert_eq!(
            resolution.url_dir,
            "ftp://ftp.geodetic.gov.hk/rinex3/2021/006/hkcl/30s/"
        );
    }

    #[test]
    fn final_orbit_switches_to_long_names_at_week_2238() {
        let before = ProductRequest::new(
            ProductCategory::PreciseOrbit,
            epoch(2022, 330),
            center("cod"),
            Archive::Igs,
        );
        let names = resolve_on(Mirror::Cddis, &before).names;
        assert_eq!(names.remote_stem, "cod22376.sp3");
        assert_eq!(names.canonical_local_name, "cod22376.sp3");
        assert!(!names.requires_conversion());

        let after = ProductRequest::new(
            ProductCategory::PreciseOrbit,
            epoch(2022, 331),
            center("cod"),
            Archive::Igs,
        );
        let resolution = resolve_on(Mirror::Cddis, &after);
        assert_eq!(
            resolution.url_dir,
            "ftps://gdc.cddis.eosdis.nasa.gov/gnss/products/2238/"
        );
        assert_eq!(
            resolution.names.remote_stem,
            "COD0OPSFIN_20223310000_01D_*_ORB.SP3"
        );
        assert_eq!(resolution.names.intermediate_name, "cod22380.sp3");
    }

    #[test]
    fn weekly_eop_is_named_for_week_start() {
        let request = ProductRequest::new(
            ProductCategory::EarthOrientation,
            epoch(2023, 4),
            center("igs"),
            Archive::Igs,
        );
        let names = resolve_on(Mirror::Cddis, &request).names;
        assert_eq!(names.remote_stem, "IGS0OPSFIN_20230010000_07D_01D_ERP.ERP");
        assert_eq!(names.canonical_local_name, "igs22437.erp");
    }

    #[test]
    fn ultra_rapid_sessions_follow_center_step() {
        let at_six = epoch(2021, 6).with_hour(6).unwrap();
        let request = ProductRequest::new(
            ProductCategory::PreciseOrbit,
            at_six,
            center("igs_u"),
            Archive::Igs,
        );
        assert_eq!(
            resolve_on(Mirror::Cddis, &request).names.remote_stem,
            "igu21393_06.sp3"
        );

        let at_three = epoch(2021, 6).with_hour(3).unwrap();
        let off_session = ProductRequest::new(
            ProductCategory::PreciseOrbit,
            at_three,
            center("igs_u"),
            Archive::Igs,
        );
        let err = resolve(&ArchiveCatalog::new(Mirror::Cddis), &off_session).unwrap_err();
        assert_matches!(err, GnssError::UnsupportedCombination { .. });

        let gfz = ProductRequest::new(
            ProductCategory::PreciseOrbit,
            at_three,
            center("gfz_u"),
            Archive::Igs,
        );
        assert_eq!(
            resolve_on(Mirror::Cddis, &gfz).names.remote_stem,
            "gfu21393_03.sp3"
        );
    }

    #[test]
    fn ultra_rapid_clock_is_unsupported() {
        let request = ProductRequest::new(
            ProductCategory::PreciseClock,
            epoch(2021, 6),
            center("igs_u"),
            Archive::Igs,
        );
        let err = resolve(&ArchiveCatalog::new(Mirror::Cddis), &request).unwrap_err();
        assert_matches!(
            err,
            GnssError::UnsupportedCombination {
                category: ProductCategory::PreciseClock,
                ..
            }
        );
    }

    #[test]
    fn mgex_products_rename_to_short_names() {
        let request = ProductRequest::new(
            ProductCategory::AttitudeExchange,
            epoch(2021, 6),
            center("cod_m"),
            Archive::Mgex,
        );
        let resolution = resolve_on(Mirror::Whu, &request);
        assert_eq!(
            resolution.url_dir,
            "ftp://igs.gnsswhu.cn/pub/gps/products/mgex/2139/"
        );
        assert_eq!(
            resolution.names.remote_stem,
            "COD0MGXFIN_20210060000_01D_*_ATT.OBX"
        );
        assert_eq!(resolution.names.canonical_local_name, "com21393.obx");
    }

    #[test]
    fn mixed_navigation_layout_depends_on_year() {
        let recent = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            epoch(2021, 6),
            center("igs"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Mixed);
        let resolution = resolve_on(Mirror::Cddis, &recent);
        assert!(resolution.url_dir.ends_with("/daily/2021/006/21p/"));
        assert_eq!(
            resolution.names.remote_stem,
            "BRD*00IGS_*_20210060000_01D_MN.rnx"
        );
        assert_eq!(resolution.names.canonical_local_name, "brdm0060.21p");

        let older = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            epoch(2019, 6),
            center("igs"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Mixed);
        let resolution = resolve_on(Mirror::Cddis, &older);
        assert!(resolution.url_dir.contains("campaign/mgex/daily/rinex3/2019/brdm/"));
        assert_eq!(resolution.names.remote_stem, "brdm0060.19p");

        let err = resolve(&ArchiveCatalog::new(Mirror::Ign), &older).unwrap_err();
        assert_matches!(err, GnssError::UnknownRoute { .. });
    }

    #[test]
    fn gps_broadcast_fills_type_directory() {
        let request = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            epoch(2021, 6),
            center("igs"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Gps);
        let resolution = resolve_on(Mirror::Cddis, &request);
        assert!(resolution.url_dir.ends_with("/daily/2021/006/21n/"));
        assert_eq!(resolution.names.remote_stem, "brdc0060.21n");
    }

    #[test]
    fn code_troposphere_is_renamed_to_lowercase() {
        let request = ProductRequest::new(
            ProductCategory::Troposphere,
            epoch(2021, 6),
            center("cod"),
            Archive::Code,
        );
        let resolution = resolve_on(Mirror::Cddis, &request);
        assert_eq!(resolution.url_dir, "http://ftp.aiub.unibe.ch/CODE/2021/");
        assert_eq!(resolution.names.remote_stem, "COD21393.TRO");
        assert_eq!(resolution.names.intermediate_name, "cod21393.tro");
        assert_eq!(
            resolution.names.candidates,
            vec![Compression::Compress, Compression::Gzip]
        );
    }

    #[test]
    fn antenna_model_is_fetched_uncompressed() {
        let request = ProductRequest::new(
            ProductCategory::AntennaExchange,
            epoch(2023, 1),
            Subject::Global,
            Archive::IgsCentral,
        );
        let resolution = resolve_on(Mirror::Cddis, &request);
        assert_eq!(resolution.names.remote_pattern(), "igs20.atx");
        assert_eq!(resolution.names.candidates, vec![Compression::None]);
        assert_eq!(
            resolution.requested_url(),
            "https://files.igs.org/pub/station/general/igs20.atx"
        );
    }

    #[test]
    fn unknown_center_product_is_rejected() {
        let request = ProductRequest::new(
            ProductCategory::BiasDsb,
            epoch(2021, 6),
            center("cod"),
            Archive::Igs,
        );
        let err = resolve(&ArchiveCatalog::new(Mirror::Cddis), &request).unwrap_err();
        assert_matches!(err, GnssError::UnsupportedCombination { .. });
    }

    #[test]
    fn hourly_site_navigation_uses_hour_letter_and_hourly_tree() {
        let at_five = epoch(2021, 6).with_hour(5).unwrap();
        let igs = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            at_five,
            site("abpo"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Gps);
        let resolution = resolve_on(Mirror::Cddis, &igs);
        assert_eq!(resolution.names.remote_stem, "abpo006f.21n");
        assert_eq!(resolution.names.canonical_local_name, "abpo006f.21n");
        assert!(resolution.url_dir.ends_with("/gnss/data/hourly/2021/006/05/"));

        let mgex = igs.retargeted(Archive::Mgex).with_nav_system(NavSystem::Mixed);
        let resolution = resolve_on(Mirror::Whu, &mgex);
        assert_eq!(
            resolution.names.remote_stem,
            "ABPO*_20210060500_01H_MN.rnx"
        );
        assert_eq!(resolution.names.canonical_local_name, "abpo006f.21p");
        assert!(!resolution.names.requires_conversion());
        assert!(resolution.url_dir.ends_with("/hourly/2021/006/05/"));
    }

    #[test]
    fn hourly_navigation_needs_a_site() {
        let request = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            epoch(2021, 6).with_hour(5).unwrap(),
            center("igs"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Gps);
        let err = resolve(&ArchiveCatalog::new(Mirror::Cddis), &request).unwrap_err();
        assert_matches!(err, GnssError::UnsupportedCombination { .. });

        let galileo = ProductRequest::new(
            ProductCategory::BroadcastEphemeris,
            epoch(2021, 6).with_hour(5).unwrap(),
            site("abpo"),
            Archive::Igs,
        )
        .with_nav_system(NavSystem::Galileo);
        assert!(resolve(&ArchiveCatalog::new(Mirror::Cddis), &galileo).is_err());
    }

    #[test]
    fn rapid_gims_from_cas_and_jpl() {
        let cas = ProductRequest::new(
            ProductCategory::IonosphereMap,
            epoch(2021, 6),
            center("cas_r"),
            Archive::Igs,
        );
        assert_eq!(
            resolve_on(Mirror::Cddis, &cas).names.canonical_local_name,
            "carg0060.21i"
        );

        let jpl = ProductRequest::new(
            ProductCategory::IonosphereMap,
            epoch(2024, 60),
            center("jpl_r"),
            Archive::Igs,
        );
        let names = resolve_on(Mirror::Cddis, &jpl).names;
        assert_eq!(names.remote_stem, "JPL0OPSRAP_20240600000_01D_*_GIM.INX");
        assert_eq!(names.canonical_local_name, "jprg0600.24i");
    }

    #[test]
    fn code_monthly_dcb_comes_from_aiub() {
        let request = ProductRequest::new(
            ProductCategory::BiasDsb,
            epoch(2021, 60).month_start().unwrap(),
            center("cod"),
            Archive::Code,
        )
        .with_dcb_pair(DcbPair::P1C1);
        let resolution = resolve_on(Mirror::Ign, &request);
        assert_eq!(resolution.url_dir, "http://ftp.aiub.unibe.ch/CODE/2021/");
        assert_eq!(resolution.names.remote_stem, "P1C12103.DCB");
        assert_eq!(
            resolution.requested_url(),
            "http://ftp.aiub.unibe.ch/CODE/2021/P1C12103.DCB.*"
        );

        let default_pair = ProductRequest {
            dcb_pair: None,
            ..request
        };
        assert_eq!(
            resolve_on(Mirror::Ign, &default_pair).names.remote_stem,
            "P1P22103.DCB"
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let request = ProductRequest::new(
            ProductCategory::IonosphereMap,
            epoch(2024, 60),
            center("cod"),
            Archive::Igs,
        );
        let first = resolve_on(Mirror::Cddis, &request);
        let second = resolve_on(Mirror::Cddis, &request);
        assert_eq!(first, second);
        assert_eq!(first.names.remote_stem, "COD0OPSFIN_20240600000_01D_*_GIM.INX");
        assert_eq!(first.names.canonical_local_name, "codg0600.24i");
    }
}
