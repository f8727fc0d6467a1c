use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

use crate::epoch::Epoch;
use crate::error::GnssError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    ObservationDaily,
    ObservationHourly,
    ObservationHighrate,
    BroadcastEphemeris,
    PreciseOrbit,
    PreciseClock,
    EarthOrientation,
    AttitudeExchange,
    BiasDsb,
    BiasOsb,
    Sinex,
    IonosphereMap,
    Roti,
    Troposphere,
    AntennaExchange,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 15] = [
        ProductCategory::ObservationDaily,
        ProductCategory::ObservationHourly,
        ProductCategory::ObservationHighrate,
        ProductCategory::BroadcastEphemeris,
        ProductCategory::PreciseOrbit,
        ProductCategory::PreciseClock,
        ProductCategory::EarthOrientation,
        ProductCategory::AttitudeExchange,
        ProductCategory::BiasDsb,
        ProductCategory::BiasOsb,
        ProductCategory::Sinex,
        ProductCategory::IonosphereMap,
        ProductCategory::Roti,
        ProductCategory::Troposphere,
        ProductCategory::AntennaExchange,
    ];

    /// Top-level directory of the local tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ProductCategory::ObservationDaily
            | ProductCategory::ObservationHourly
            | ProductCategory::ObservationHighrate => "obs",
            ProductCategory::BroadcastEphemeris => "nav",
            ProductCategory::PreciseOrbit => "orb",
            ProductCategory::PreciseClock => "clk",
            ProductCategory::EarthOrientation => "eop",
            ProductCategory::AttitudeExchange => "obx",
            ProductCategory::BiasDsb | ProductCategory::BiasOsb => "bia",
            ProductCategory::Sinex => "snx",
            ProductCategory::IonosphereMap | ProductCategory::Roti => "ion",
            ProductCategory::Troposphere => "ztd",
            ProductCategory::AntennaExchange => "atx",
        }
    }

    pub fn is_observation(&self) -> bool {
        matches!(
            self,
            ProductCategory::ObservationDaily
                | ProductCategory::ObservationHourly
                | ProductCategory::ObservationHighrate
        )
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductCategory::ObservationDaily => "observation-daily",
            ProductCategory::ObservationHourly => "observation-hourly",
            ProductCategory::ObservationHighrate => "observation-highrate",
            ProductCategory::BroadcastEphemeris => "broadcast-ephemeris",
            ProductCategory::PreciseOrbit => "precise-orbit",
            ProductCategory::PreciseClock => "precise-clock",
            ProductCategory::EarthOrientation => "earth-orientation",
            ProductCategory::AttitudeExchange => "attitude-exchange",
            ProductCategory::BiasDsb => "bias-dsb",
            ProductCategory::BiasOsb => "bias-osb",
            ProductCategory::Sinex => "sinex",
            ProductCategory::IonosphereMap => "ionosphere-map",
            ProductCategory::Roti => "roti",
            ProductCategory::Troposphere => "troposphere",
            ProductCategory::AntennaExchange => "antenna-exchange",
        };
        f.write_str(name)
    }
}

/// IGS data mirror serving the `igs` and `mgex` archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    Cddis,
    Ign,
    Whu,
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mirror::Cddis => write!(f, "cddis"),
            Mirror::Ign => write!(f, "ign"),
            Mirror::Whu => write!(f, "whu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archive {
    Igs,
    Mgex,
    Cut,
    Ga,
    Hk,
    Ngs,
    Epn,
    Pbo2,
    Pbo3,
    Code,
    Cnes,
    IgsCentral,
}

impl Archive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archive::Igs => "igs",
            Archive::Mgex => "mgex",
            Archive::Cut => "cut",
            Archive::Ga => "ga",
            Archive::Hk => "hk",
            Archive::Ngs => "ngs",
            Archive::Epn => "epn",
            Archive::Pbo2 => "pbo2",
            Archive::Pbo3 => "pbo3",
            Archive::Code => "code",
            Archive::Cnes => "cnes",
            Archive::IgsCentral => "igs-central",
        }
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archive {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "igs" => Ok(Archive::Igs),
            "mgex" => Ok(Archive::Mgex),
            "cut" => Ok(Archive::Cut),
            "ga" => Ok(Archive::Ga),
            "hk" => Ok(Archive::Hk),
            "ngs" => Ok(Archive::Ngs),
            "epn" => Ok(Archive::Epn),
            "pbo2" => Ok(Archive::Pbo2),
            "pbo3" => Ok(Archive::Pbo3),
            "code" => Ok(Archive::Code),
            "cnes" => Ok(Archive::Cnes),
            "igs-central" => Ok(Archive::IgsCentral),
            _ => Err(GnssError::InvalidArchive(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    Compress,
    None,
}

impl Compression {
    pub fn suffix(&self) -> &'static str {
        match self {
            Compression::Gzip => ".gz",
            Compression::Compress => ".Z",
            Compression::None => "",
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteCode(String);

impl SiteCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-case form used by long RINEX names.
    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SiteCode {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let is_valid =
            normalized.len() == 4 && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(GnssError::InvalidSiteCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CenterCode {
    Cas,
    Cnt,
    Cod,
    Dlr,
    Emr,
    Esa,
    Gfz,
    Gop,
    Grg,
    Ign,
    Igs,
    Jpl,
    Mit,
    Upc,
    Whu,
    Wrd,
}

impl CenterCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CenterCode::Cas => "cas",
            CenterCode::Cnt => "cnt",
            CenterCode::Cod => "cod",
            CenterCode::Dlr => "dlr",
            CenterCode::Emr => "emr",
            CenterCode::Esa => "esa",
            CenterCode::Gfz => "gfz",
            CenterCode::Gop => "gop",
            CenterCode::Grg => "grg",
            CenterCode::Ign => "ign",
            CenterCode::Igs => "igs",
            CenterCode::Jpl => "jpl",
            CenterCode::Mit => "mit",
            CenterCode::Upc => "upc",
            CenterCode::Whu => "whu",
            CenterCode::Wrd => "wrd",
        }
    }

    pub fn upper(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl FromStr for CenterCode {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = match value {
            "cas" => CenterCode::Cas,
            "cnt" => CenterCode::Cnt,
            "cod" => CenterCode::Cod,
            "dlr" => CenterCode::Dlr,
            "emr" => CenterCode::Emr,
            "esa" => CenterCode::Esa,
            "gfz" => CenterCode::Gfz,
            "gop" => CenterCode::Gop,
            "grg" => CenterCode::Grg,
            "ign" => CenterCode::Ign,
            "igs" => CenterCode::Igs,
            "jpl" => CenterCode::Jpl,
            "mit" => CenterCode::Mit,
            "upc" => CenterCode::Upc,
            "whu" => CenterCode::Whu,
            "wrd" => CenterCode::Wrd,
            _ => return Err(GnssError::InvalidCenter(value.to_string())),
        };
        Ok(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductLine {
    Final,
    Mgex,
    Rapid,
    UltraRapid,
}

/// Analysis center code plus product line, written `cod`, `cod_m`, `igs_r`, `igs_u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnalysisCenter {
    pub code: CenterCode,
    pub line: ProductLine,
}

impl AnalysisCenter {
    pub fn new(code: CenterCode, line: ProductLine) -> Self {
        Self { code, line }
    }

    /// Hours between successive ultra-rapid sessions; 24 for daily products.
    pub fn session_step(&self) -> u32 {
        match (self.line, self.code) {
            (ProductLine::UltraRapid, CenterCode::Igs | CenterCode::Esa) => 6,
            (ProductLine::UltraRapid, CenterCode::Gfz) => 3,
            (ProductLine::UltraRapid, CenterCode::Whu) => 1,
            _ => 24,
        }
    }

    /// Archive that publishes this center's products of the given kind.
    pub fn home_archive(&self, category: ProductCategory) -> Archive {
        match (self.code, self.line, category) {
            (CenterCode::Cnt, _, _) => Archive::Cnes,
            (_, ProductLine::Mgex, _) => Archive::Mgex,
            (
                CenterCode::Cod,
                ProductLine::Final,
                ProductCategory::Troposphere | ProductCategory::BiasDsb,
            ) => Archive::Code,
            _ => Archive::Igs,
        }
    }
}

impl fmt::Display for AnalysisCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.line {
            ProductLine::Final => "",
            ProductLine::Mgex => "_m",
            ProductLine::Rapid => "_r",
            ProductLine::UltraRapid => "_u",
        };
        write!(f, "{}{}", self.code.as_str(), suffix)
    }
}

impl FromStr for AnalysisCenter {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let (code, line) = match normalized.split_once('_') {
            None => (normalized.as_str(), ProductLine::Final),
            Some((code, "m")) => (code, ProductLine::Mgex),
            Some((code, "r")) => (code, ProductLine::Rapid),
            Some((code, "u")) => (code, ProductLine::UltraRapid),
            Some(_) => return Err(GnssError::InvalidCenter(value.to_string())),
        };
        let code = code
            .parse::<CenterCode>()
            .map_err(|_| GnssError::InvalidCenter(value.to_string()))?;
        Ok(Self { code, line })
    }
}

impl Serialize for AnalysisCenter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavSystem {
    Gps,
    Glonass,
    Galileo,
    Beidou,
    Qzss,
    Irnss,
    Mixed,
}

impl NavSystem {
    /// Last character of the short-name extension (`.21n`, `.21g`, `.21p`, ...).
    pub fn short_type(&self) -> char {
        match self {
            NavSystem::Gps => 'n',
            NavSystem::Glonass => 'g',
            NavSystem::Galileo => 'l',
            NavSystem::Beidou => 'c',
            NavSystem::Qzss => 'q',
            NavSystem::Irnss => 'i',
            NavSystem::Mixed => 'p',
        }
    }

    /// Data-type field of long RINEX 3 navigation names.
    pub fn long_type(&self) -> &'static str {
        match self {
            NavSystem::Gps => "GN",
            NavSystem::Glonass => "RN",
            NavSystem::Galileo => "EN",
            NavSystem::Beidou => "CN",
            NavSystem::Qzss => "JN",
            NavSystem::Irnss => "IN",
            NavSystem::Mixed => "MN",
        }
    }
}

impl FromStr for NavSystem {
    type Err = GnssError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gps" => Ok(NavSystem::Gps),
            "glo" | "glonass" => Ok(NavSystem::Glonass),
            "gal" | "galileo" => Ok(NavSystem::Galileo),
            "bds" | "beidou" => Ok(NavSystem::Beidou),
            "qzs" | "qzss" => Ok(NavSystem::Qzss),
            "irn" | "irnss" => Ok(NavSystem::Irnss),
            "mixed" | "mixed3" => Ok(NavSystem::Mixed),
            _ => Err(GnssError::InvalidConfig(format!(
                "unknown navigation system: {value}"
            ))),
        }
    }
}

/// Signal pair of a CODE monthly differential code bias file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DcbPair {
    P1C1,
    P1P2,
    P2C2,
}

impl DcbPair {
    pub const ALL: [DcbPair; 3] = [DcbPair::P1C1, DcbPair::P1P2, DcbPair::P2C2];
}

impl fmt::Display for DcbPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DcbPair::P1C1 => "P1C1",
            DcbPair::P1P2 => "P1P2",
            DcbPair::P2C2 => "P2C2",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Site(SiteCode),
    Center(AnalysisCenter),
    Global,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Site(site) => write!(f, "{site}"),
            Subject::Center(center) => write!(f, "{center}"),
            Subject::Global => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProductRequest {
    pub category: ProductCategory,
    pub epoch: Epoch,
    pub subject: Subject,
    pub archive: Archive,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union_with: Option<Archive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_system: Option<NavSystem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcb_pair: Option<DcbPair>,
}

impl ProductRequest {
    pub fn new(category: ProductCategory, epoch: Epoch, subject: Subject, archive: Archive) -> Self {
        Self {
            category,
            epoch,
            subject,
            archive,
            union_with: None,
            nav_system: None,
            dcb_pair: None,
        }
    }

    pub fn with_union(mut self, secondary: Archive) -> Self {
        self.union_with = Some(secondary);
        self
    }

    pub fn with_nav_system(mut self, system: NavSystem) -> Self {
        self.nav_system = Some(system);
        self
    }

    pub fn with_dcb_pair(mut self, pair: DcbPair) -> Self {
        self.dcb_pair = Some(pair);
        self
    }

    /// The same logical file, requested from a single other archive.
    pub fn retargeted(&self, archive: Archive) -> Self {
        Self {
            archive,
            union_with: None,
            ..self.clone()
        }
    }

    pub fn site(&self) -> Option<&SiteCode> {
        match &self.subject {
            Subject::Site(site) => Some(site),
            _ => None,
        }
    }

    pub fn center(&self) -> Option<AnalysisCenter> {
        match &self.subject {
            Subject::Center(center) => Some(*center),
            _ => None,
        }
    }
}

impl fmt::Display for ProductRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} from {}",
            self.category, self.subject, self.epoch, self.archive
        )?;
        if let Some(pair) = self.dcb_pair {
            write!(f, " {pair}")?;
        }
        if let Some(secondary) = self.union_with {
            write!(f, "+{secondary}")?;
        }
        Ok(())
    }
}
