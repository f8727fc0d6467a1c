use std::fs;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisCenter, Archive, Mirror, NavSystem, SiteCode};
use crate::epoch::Epoch;
use crate::error::GnssError;
use crate::report::LogMode;
use crate::tools::{DEFAULT_TOOL_TIMEOUT, ToolSettings};

pub const DEFAULT_CONFIG_FILE: &str = "gnss-fetch.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub output_root: Option<Utf8PathBuf>,
    #[serde(default)]
    pub mirror: Option<Mirror>,
    pub start: StartEntry,
    #[serde(default)]
    pub ndays: Option<u32>,
    #[serde(default)]
    pub adjacent_days: bool,
    #[serde(default)]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub tools: Option<ToolsEntry>,
    #[serde(default)]
    pub log: Option<LogEntry>,
    #[serde(default)]
    pub observations: Option<ObservationEntry>,
    #[serde(default)]
    pub navigation: Option<NavigationEntry>,
    #[serde(default)]
    pub orbit_clock: Option<SessionCenterEntry>,
    #[serde(default)]
    pub eop: Option<SessionCenterEntry>,
    #[serde(default)]
    pub attitude: Option<CenterList>,
    #[serde(default)]
    pub dsb: Option<CenterList>,
    #[serde(default)]
    pub osb: Option<CenterList>,
    #[serde(default)]
    pub sinex: bool,
    #[serde(default)]
    pub ionosphere: Option<CenterList>,
    #[serde(default)]
    pub roti: bool,
    #[serde(default)]
    pub troposphere: Option<TroposphereEntry>,
    #[serde(default)]
    pub antenna: bool,
}

/// `"2021-01-06"`, `"2021-006"` or `{ "year": 2021, "doy": 6 }`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StartEntry {
    Shorthand(String),
    Detailed { year: i32, doy: u32 },
}

/// `"cod+igs_r"` or `["cod", "igs_r"]`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CenterList {
    Shorthand(String),
    Detailed(Vec<String>),
}

/// Centers alone, or `{ "centers": "igs_u", "start_hour": 6, "hours": 12 }`
/// to bound the ultra-rapid sessions that are requested.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SessionCenterEntry {
    Centers(CenterList),
    Windowed {
        centers: CenterList,
        #[serde(default)]
        start_hour: Option<u32>,
        #[serde(default)]
        hours: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Wget,
    Http,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolsEntry {
    #[serde(default)]
    pub wget: Option<Utf8PathBuf>,
    #[serde(default)]
    pub gzip: Option<Utf8PathBuf>,
    #[serde(default)]
    pub crx2rnx: Option<Utf8PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogEntry {
    pub path: Utf8PathBuf,
    #[serde(default)]
    pub mode: LogMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    #[default]
    Daily,
    Hourly,
    Highrate,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ObservationEntry {
    #[serde(default)]
    pub kind: ObservationKind,
    pub source: String,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub site_list: Option<Utf8PathBuf>,
    #[serde(default)]
    pub start_hour: Option<u32>,
    #[serde(default)]
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationKind {
    #[default]
    Daily,
    Hourly,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavigationEntry {
    #[serde(default)]
    pub kind: NavigationKind,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub center: Option<String>,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub start_hour: Option<u32>,
    #[serde(default)]
    pub hours: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TroposphereEntry {
    #[serde(default)]
    pub center: Option<String>,
    #[serde(default)]
    pub sites: Vec<String>,
}

/// A single archive, or a union tried primary first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationSource {
    Single(Archive),
    Union { primary: Archive, secondary: Archive },
}

impl FromStr for ObservationSource {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "igm" => Ok(Self::Union {
                primary: Archive::Mgex,
                secondary: Archive::Igs,
            }),
            "pbo5" => Ok(Self::Union {
                primary: Archive::Pbo3,
                secondary: Archive::Pbo2,
            }),
            other => Ok(Self::Single(other.parse()?)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservationPlan {
    pub kind: ObservationKind,
    pub source: ObservationSource,
    pub sites: Vec<SiteCode>,
    pub window: HourWindow,
}

#[derive(Debug, Clone)]
pub struct NavigationPlan {
    pub kind: NavigationKind,
    pub system: NavSystem,
    pub source: Archive,
    pub center: AnalysisCenter,
    /// Per-site files when non-empty, otherwise the center's merged file.
    pub sites: Vec<SiteCode>,
    /// Hour window of hourly files; ignored for daily ones.
    pub window: HourWindow,
}

/// `start_hour .. min(start_hour + hours, 24)` of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start_hour: u32,
    pub hours: u32,
}

impl HourWindow {
    pub const FULL_DAY: HourWindow = HourWindow {
        start_hour: 0,
        hours: 24,
    };

    fn resolve(
        section: &str,
        start_hour: Option<u32>,
        hours: Option<u32>,
    ) -> Result<Self, GnssError> {
        let start_hour = start_hour.unwrap_or(0);
        if start_hour > 23 {
            return Err(GnssError::InvalidHour(start_hour));
        }
        let hours = hours.unwrap_or(24);
        if hours == 0 || hours > 24 {
            return Err(GnssError::InvalidConfig(format!(
                "{section}.hours must be within 1..=24, got {hours}"
            )));
        }
        Ok(Self { start_hour, hours })
    }

    pub fn end(&self) -> u32 {
        (self.start_hour + self.hours).min(24)
    }

    pub fn range(&self) -> Range<u32> {
        self.start_hour..self.end()
    }
}

/// Centers whose ultra-rapid sessions are bounded by `window`.
#[derive(Debug, Clone)]
pub struct SessionCenters {
    pub centers: Vec<AnalysisCenter>,
    pub window: HourWindow,
}

impl Default for SessionCenters {
    fn default() -> Self {
        Self {
            centers: Vec::new(),
            window: HourWindow::FULL_DAY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TropospherePlan {
    pub centers: Vec<AnalysisCenter>,
    pub sites: Vec<SiteCode>,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub path: Utf8PathBuf,
    pub mode: LogMode,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub output_root: Option<Utf8PathBuf>,
    pub mirror: Mirror,
    pub start: Epoch,
    pub ndays: u32,
    pub adjacent_days: bool,
    pub transport: Transport,
    pub tools: ToolSettings,
    pub log: Option<LogSettings>,
    pub observations: Option<ObservationPlan>,
    pub navigation: Option<NavigationPlan>,
    pub orbit_clock: SessionCenters,
    pub eop: SessionCenters,
    pub attitude: Vec<AnalysisCenter>,
    pub dsb: Vec<AnalysisCenter>,
    pub osb: Vec<AnalysisCenter>,
    pub sinex: bool,
    pub ionosphere: Vec<AnalysisCenter>,
    pub roti: bool,
    pub troposphere: Option<TropospherePlan>,
    pub antenna: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GnssError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Err(GnssError::MissingConfig);
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| GnssError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GnssError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GnssError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let start: Epoch = match config.start {
            StartEntry::Shorthand(value) => value.parse()?,
            StartEntry::Detailed { year, doy } => Epoch::from_year_doy(year, doy)?,
        };
        if start.hour().is_some() {
            return Err(GnssError::InvalidConfig(format!(
                "start must be a calendar day, got {start}"
            )));
        }
        let ndays = config.ndays.unwrap_or(1);
        if ndays == 0 {
            return Err(GnssError::InvalidConfig("ndays must be at least 1".to_string()));
        }

        let tools_entry = config.tools.unwrap_or_default();
        let timeout = match tools_entry.timeout_secs {
            Some(0) => {
                return Err(GnssError::InvalidConfig(
                    "tools.timeout_secs must be positive".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TOOL_TIMEOUT,
        };
        let tools = ToolSettings {
            wget: tools_entry.wget,
            gzip: tools_entry.gzip,
            crx2rnx: tools_entry.crx2rnx,
            timeout,
            verbose: tools_entry.verbose,
        };

        let observations = config.observations.map(resolve_observations).transpose()?;
        let navigation = config.navigation.map(resolve_navigation).transpose()?;
        let troposphere = config.troposphere.map(resolve_troposphere).transpose()?;

        Ok(ResolvedConfig {
            schema_version,
            output_root: config.output_root,
            mirror: config.mirror.unwrap_or(Mirror::Cddis),
            start,
            ndays,
            adjacent_days: config.adjacent_days,
            transport: config.transport.unwrap_or_default(),
            tools,
            log: config.log.map(|entry| LogSettings {
                path: entry.path,
                mode: entry.mode,
            }),
            observations,
            navigation,
            orbit_clock: session_centers("orbit_clock", config.orbit_clock, ORBIT_ALIASES)?,
            eop: session_centers("eop", config.eop, &[])?,
            attitude: centers(config.attitude, MGEX_ALIASES)?,
            dsb: centers(config.dsb, DSB_ALIASES)?,
            osb: centers(config.osb, MGEX_ALIASES)?,
            sinex: config.sinex,
            ionosphere: centers(config.ionosphere, IONOSPHERE_ALIASES)?,
            roti: config.roti,
            troposphere,
            antenna: config.antenna,
        })
    }
}

type CenterAliases = &'static [(&'static str, &'static [&'static str])];

const MGEX_FINAL: &[&str] = &["cod_m", "gfz_m", "grg_m", "whu_m"];

const ORBIT_ALIASES: CenterAliases = &[
    ("all", &["cod", "emr", "esa", "gfz", "grg", "igs", "jpl", "mit"]),
    ("all_m", MGEX_FINAL),
];

const MGEX_ALIASES: CenterAliases = &[("all_m", MGEX_FINAL)];

const DSB_ALIASES: CenterAliases = &[("all", &["cod", "cas"])];

const IONOSPHERE_ALIASES: CenterAliases = &[
    ("all", &["cas", "cod", "emr", "esa", "igs", "jpl", "upc"]),
    ("all_r", &["cas_r", "cod_r", "esa_r", "igs_r", "jpl_r", "upc_r"]),
];

fn session_centers(
    section: &str,
    entry: Option<SessionCenterEntry>,
    aliases: CenterAliases,
) -> Result<SessionCenters, GnssError> {
    let (list, window) = match entry {
        None => return Ok(SessionCenters::default()),
        Some(SessionCenterEntry::Centers(list)) => (list, HourWindow::FULL_DAY),
        Some(SessionCenterEntry::Windowed {
            centers,
            start_hour,
            hours,
        }) => (centers, HourWindow::resolve(section, start_hour, hours)?),
    };
    Ok(SessionCenters {
        centers: centers(Some(list), aliases)?,
        window,
    })
}

/// Splits `+` shorthand, expands section aliases such as `all`, and drops
/// repeats while keeping first-seen order.
fn centers(
    list: Option<CenterList>,
    aliases: CenterAliases,
) -> Result<Vec<AnalysisCenter>, GnssError> {
    let values = match list {
        None => return Ok(Vec::new()),
        Some(CenterList::Shorthand(value)) => value
            .split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
        Some(CenterList::Detailed(values)) => values,
    };
    let mut out = Vec::new();
    for value in values {
        let normalized = value.trim().to_ascii_lowercase();
        let expanded = match aliases.iter().find(|(alias, _)| *alias == normalized) {
            Some((_, members)) => members.to_vec(),
            None => vec![normalized.as_str()],
        };
        for member in expanded {
            let center = member.parse::<AnalysisCenter>()?;
            if !out.contains(&center) {
                out.push(center);
            }
        }
    }
    Ok(out)
}

fn sites(values: &[String]) -> Result<Vec<SiteCode>, GnssError> {
    values.iter().map(|value| value.parse()).collect()
}

fn resolve_observations(entry: ObservationEntry) -> Result<ObservationPlan, GnssError> {
    let source = entry.source.parse()?;
    let mut site_codes = sites(&entry.sites)?;
    if let Some(path) = &entry.site_list {
        for site in read_site_list(path)? {
            if !site_codes.contains(&site) {
                site_codes.push(site);
            }
        }
    }
    if site_codes.is_empty() {
        return Err(GnssError::InvalidConfig(
            "observations need `sites` or `site_list`".to_string(),
        ));
    }

    Ok(ObservationPlan {
        kind: entry.kind,
        source,
        sites: site_codes,
        window: HourWindow::resolve("observations", entry.start_hour, entry.hours)?,
    })
}

fn resolve_navigation(entry: NavigationEntry) -> Result<NavigationPlan, GnssError> {
    let system = entry
        .system
        .as_deref()
        .map(str::parse)
        .transpose()?
        .unwrap_or(NavSystem::Mixed);
    let source = entry
        .source
        .as_deref()
        .map(str::parse)
        .transpose()?
        .unwrap_or(Archive::Igs);
    let center = entry.center.as_deref().unwrap_or("igs").parse()?;
    let sites = sites(&entry.sites)?;
    if entry.kind == NavigationKind::Hourly && sites.is_empty() {
        return Err(GnssError::InvalidConfig(
            "hourly navigation is published per site; list `sites`".to_string(),
        ));
    }
    Ok(NavigationPlan {
        kind: entry.kind,
        system,
        source,
        center,
        sites,
        window: HourWindow::resolve("navigation", entry.start_hour, entry.hours)?,
    })
}

fn resolve_troposphere(entry: TroposphereEntry) -> Result<TropospherePlan, GnssError> {
    let centers = match entry.center {
        Some(value) => centers(Some(CenterList::Shorthand(value)), &[])?,
        None => Vec::new(),
    };
    let plan = TropospherePlan {
        centers,
        sites: sites(&entry.sites)?,
    };
    if plan.centers.is_empty() && plan.sites.is_empty() {
        return Err(GnssError::InvalidConfig(
            "troposphere needs `center` or `sites`".to_string(),
        ));
    }
    Ok(plan)
}

/// One site per line; `#` starts a comment and only the first four
/// characters of a line are used, so annotated lists work unchanged.
pub fn read_site_list(path: &Utf8Path) -> Result<Vec<SiteCode>, GnssError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| GnssError::ConfigRead(path.to_path_buf()))?;
    let mut out = Vec::new();
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let code = line.chars().take(4).collect::<String>();
        let site = code.parse::<SiteCode>()?;
        if !out.contains(&site) {
            out.push(site);
        }
    }
    Ok(out)
}
