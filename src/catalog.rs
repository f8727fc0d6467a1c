//! Static table of remote base locations.
//!
//! Templates use `{yyyy}`, `{yy}`, `{ddd}`, `{wwww}`, `{hh}`, `{site}` and
//! `{type}` placeholders; the resolver expands them for a concrete epoch.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Archive, Mirror, ProductCategory};
use crate::error::GnssError;

/// Directory layout generation of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Current,
    /// Layout used before an archive reorganized its tree.
    Legacy,
    /// Hour-keyed subtree holding sub-daily files of a day-keyed product.
    Hourly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRoute {
    pub archive: Archive,
    pub category: ProductCategory,
    pub layout: Layout,
    pub base_url: String,
    /// Number of remote path components the fetch tool must strip so files
    /// land directly in the working directory.
    pub cut_dirs: usize,
    /// Whether this archive habitually publishes `.gz` rather than `.Z`.
    pub gzip_first: bool,
}

impl ArchiveRoute {
    fn new(
        archive: Archive,
        category: ProductCategory,
        layout: Layout,
        base_url: &str,
        gzip_first: bool,
    ) -> Self {
        Self {
            archive,
            category,
            layout,
            base_url: base_url.to_string(),
            cut_dirs: path_depth(base_url),
            gzip_first,
        }
    }
}

type RouteKey = (Archive, ProductCategory, Layout);

#[derive(Debug, Clone)]
pub struct ArchiveCatalog {
    mirror: Mirror,
    routes: HashMap<RouteKey, ArchiveRoute>,
}

impl ArchiveCatalog {
    pub fn new(mirror: Mirror) -> Self {
        let mut routes = HashMap::new();
        let mut add = |archive, category, layout, base_url: &str, gzip_first| {
            let route = ArchiveRoute::new(archive, category, layout, base_url, gzip_first);
            routes.insert((archive, category, layout), route);
        };

        for (archive, category, layout, base_url, gzip_first) in mirror_routes(mirror) {
            add(archive, category, layout, &base_url, gzip_first);
        }
        for (archive, category, base_url, gzip_first) in NETWORK_ROUTES {
            add(archive, category, Layout::Current, base_url, gzip_first);
        }

        Self { mirror, routes }
    }

    pub fn mirror(&self) -> Mirror {
        self.mirror
    }

    pub fn layout_route(
        &self,
        archive: Archive,
        category: ProductCategory,
        layout: Layout,
    ) -> Result<&ArchiveRoute, GnssError> {
        self.routes
            .get(&(archive, category, layout))
            .ok_or(GnssError::UnknownRoute { archive, category })
    }

    pub fn route(
        &self,
        archive: Archive,
        category: ProductCategory,
    ) -> Result<&ArchiveRoute, GnssError> {
        self.layout_route(archive, category, Layout::Current)
    }

    pub fn legacy_route(
        &self,
        archive: Archive,
        category: ProductCategory,
    ) -> Result<&ArchiveRoute, GnssError> {
        self.layout_route(archive, category, Layout::Legacy)
    }

    pub fn routes(&self) -> impl Iterator<Item = &ArchiveRoute> {
        self.routes.values()
    }
}

const NETWORK_ROUTES: [(Archive, ProductCategory, &str, bool); 14] = [
    (
        Archive::Cut,
        ProductCategory::ObservationDaily,
        "http://saegnss2.curtin.edu.au/ldc/rinex3/daily/{yyyy}/{ddd}/",
        true,
    ),
    (
        Archive::Ga,
        ProductCategory::ObservationDaily,
        "ftp://ftp.data.gnss.ga.gov.au/daily/{yyyy}/{ddd}/",
        true,
    ),
    (
        Archive::Hk,
        ProductCategory::ObservationDaily,
        "ftp://ftp.geodetic.gov.hk/rinex3/{yyyy}/{ddd}/{site}/30s/",
        true,
    ),
    (
        Archive::Ngs,
        ProductCategory::ObservationDaily,
        "https://geodesy.noaa.gov/corsdata/rinex/{yyyy}/{ddd}/{site}/",
        true,
    ),
    (
        Archive::Epn,
        ProductCategory::ObservationDaily,
        "ftp://ftp.epncb.oma.be/pub/obs/{yyyy}/{ddd}/",
        true,
    ),
    (
        Archive::Pbo2,
        ProductCategory::ObservationDaily,
        "ftp://data-out.unavco.org/pub/rinex/obs/{yyyy}/{ddd}/",
        false,
    ),
    (
        Archive::Pbo3,
        ProductCategory::ObservationDaily,
        "ftp://data-out.unavco.org/pub/rinex3/obs/{yyyy}/{ddd}/",
        true,
    ),
    (
        Archive::Code,
        ProductCategory::Troposphere,
        "http://ftp.aiub.unibe.ch/CODE/{yyyy}/",
        false,
    ),
    (
        Archive::Code,
        ProductCategory::BiasDsb,
        "http://ftp.aiub.unibe.ch/CODE/{yyyy}/",
        false,
    ),
    (
        Archive::Cnes,
        ProductCategory::PreciseOrbit,
        "http://www.ppp-wizard.net/products/REAL_TIME/",
        true,
    ),
    (
        Archive::Cnes,
        ProductCategory::PreciseClock,
        "http://www.ppp-wizard.net/products/REAL_TIME/",
        true,
    ),
    (
        Archive::Cnes,
        ProductCategory::AttitudeExchange,
        "http://www.ppp-wizard.net/products/REAL_TIME/",
        true,
    ),
    (
        Archive::Cnes,
        ProductCategory::BiasOsb,
        "http://www.ppp-wizard.net/products/REAL_TIME/",
        true,
    ),
    (
        Archive::IgsCentral,
        ProductCategory::AntennaExchange,
        "https://files.igs.org/pub/station/general/",
        false,
    ),
];

fn mirror_routes(mirror: Mirror) -> Vec<(Archive, ProductCategory, Layout, String, bool)> {
    use Layout::{Current, Hourly, Legacy};
    use ProductCategory as C;

    let (host, data, products, gzip_first) = match mirror {
        Mirror::Cddis => (
            "ftps://gdc.cddis.eosdis.nasa.gov",
            "/gnss/data",
            "/gnss/products",
            true,
        ),
        Mirror::Ign => ("ftp://igs.ign.fr", "/pub/igs/data", "/pub/igs/products", false),
        Mirror::Whu => ("ftp://igs.gnsswhu.cn", "/pub/gps/data", "/pub/gps/products", true),
    };
    let data = format!("{host}{data}");
    let products = format!("{host}{products}");

    let (daily, hourly, highrate, nav, ionex, zpd, bias) = match mirror {
        Mirror::Ign => (
            format!("{data}/{{yyyy}}/{{ddd}}/"),
            Some(format!("{data}/hourly/{{yyyy}}/{{ddd}}/")),
            None,
            format!("{data}/{{yyyy}}/{{ddd}}/"),
            format!("{products}/ionosphere/{{yyyy}}/{{ddd}}/"),
            None,
            None,
        ),
        Mirror::Cddis | Mirror::Whu => (
            format!("{data}/daily/{{yyyy}}/{{ddd}}/{{yy}}d/"),
            Some(format!("{data}/hourly/{{yyyy}}/{{ddd}}/{{hh}}/")),
            Some(format!("{data}/highrate/{{yyyy}}/{{ddd}}/{{yy}}d/{{hh}}/")),
            format!("{data}/daily/{{yyyy}}/{{ddd}}/{{yy}}{{type}}/"),
            format!("{products}/ionex/{{yyyy}}/{{ddd}}/"),
            Some(format!("{products}/troposphere/zpd/{{yyyy}}/{{ddd}}/")),
            Some(format!("{products}/bias/{{yyyy}}/")),
        ),
    };
    let weekly = format!("{products}/{{wwww}}/");
    let mgex_weekly = format!("{products}/mgex/{{wwww}}/");

    let mut routes = Vec::new();
    for archive in [Archive::Igs, Archive::Mgex] {
        routes.push((archive, C::ObservationDaily, Current, daily.clone(), gzip_first));
        if let Some(hourly) = &hourly {
            routes.push((archive, C::ObservationHourly, Current, hourly.clone(), gzip_first));
            routes.push((archive, C::BroadcastEphemeris, Hourly, hourly.clone(), gzip_first));
        }
        if let Some(highrate) = &highrate {
            routes.push((archive, C::ObservationHighrate, Current, highrate.clone(), gzip_first));
        }
        routes.push((archive, C::BroadcastEphemeris, Current, nav.clone(), gzip_first));
    }
    if mirror == Mirror::Cddis {
        routes.push((
            Archive::Igs,
            C::BroadcastEphemeris,
            Legacy,
            format!("{data}/campaign/mgex/daily/rinex3/{{yyyy}}/brdm/"),
            false,
        ));
    }
    for category in [C::PreciseOrbit, C::PreciseClock, C::EarthOrientation, C::Sinex] {
        routes.push((Archive::Igs, category, Current, weekly.clone(), gzip_first));
    }
    for category in [C::IonosphereMap, C::Roti] {
        routes.push((Archive::Igs, category, Current, ionex.clone(), gzip_first));
    }
    if let Some(zpd) = zpd {
        routes.push((Archive::Igs, C::Troposphere, Current, zpd, gzip_first));
    }
    if let Some(bias) = bias {
        routes.push((Archive::Igs, C::BiasDsb, Current, bias, true));
    }
    for category in [C::PreciseOrbit, C::PreciseClock, C::AttitudeExchange, C::BiasOsb] {
        routes.push((Archive::Mgex, category, Current, mgex_weekly.clone(), true));
    }
    routes
}

/// Number of path components after the host in a URL template.
fn path_depth(url: &str) -> usize {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .split('/')
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .count()
}
