use assert_matches::assert_matches;

use gnss_archive_fetch::domain::{
    AnalysisCenter, Archive, CenterCode, NavSystem, ProductCategory, ProductLine, SiteCode,
};
use gnss_archive_fetch::error::GnssError;

#[test]
fn parse_analysis_center_lines() {
    let final_cod: AnalysisCenter = "COD".parse().unwrap();
    assert_eq!(final_cod, AnalysisCenter::new(CenterCode::Cod, ProductLine::Final));

    let ultra: AnalysisCenter = "igs_u".parse().unwrap();
    assert_eq!(ultra.line, ProductLine::UltraRapid);
    assert_eq!(ultra.session_step(), 6);
    assert_eq!(ultra.to_string(), "igs_u");

    let gfz: AnalysisCenter = "gfz_u".parse().unwrap();
    assert_eq!(gfz.session_step(), 3);
}

#[test]
fn parse_analysis_center_invalid() {
    assert_matches!(
        "cod_x".parse::<AnalysisCenter>(),
        Err(GnssError::InvalidCenter(_))
    );
    assert_matches!(
        "nasa".parse::<AnalysisCenter>(),
        Err(GnssError::InvalidCenter(_))
    );
}

#[test]
fn home_archive_follows_product_line() {
    let cnes: AnalysisCenter = "cnt".parse().unwrap();
    assert_eq!(cnes.home_archive(ProductCategory::BiasOsb), Archive::Cnes);

    let mgex: AnalysisCenter = "cod_m".parse().unwrap();
    assert_eq!(mgex.home_archive(ProductCategory::AttitudeExchange), Archive::Mgex);

    let code: AnalysisCenter = "cod".parse().unwrap();
    assert_eq!(code.home_archive(ProductCategory::Troposphere), Archive::Code);
    assert_eq!(code.home_archive(ProductCategory::PreciseOrbit), Archive::Igs);
}

#[test]
fn parse_archive_round_trip() {
    for value in ["igs", "mgex", "pbo3", "igs-central"] {
        let archive: Archive = value.parse().unwrap();
        assert_eq!(archive.to_string(), value);
    }
    assert_matches!("ftp".parse::<Archive>(), Err(GnssError::InvalidArchive(_)));
}

#[test]
fn parse_site_code_invalid() {
    assert_matches!("ab-1".parse::<SiteCode>(), Err(GnssError::InvalidSiteCode(_)));
}

#[test]
fn nav_system_aliases() {
    assert_eq!("glo".parse::<NavSystem>().unwrap(), NavSystem::Glonass);
    assert_eq!("mixed3".parse::<NavSystem>().unwrap(), NavSystem::Mixed);
    assert_eq!(NavSystem::Galileo.long_type(), "EN");
    assert!("sbas".parse::<NavSystem>().is_err());
}

#[test]
fn every_category_has_a_directory() {
    for category in ProductCategory::ALL {
        assert!(!category.dir_name().is_empty());
    }
    assert!(ProductCategory::ObservationHighrate.is_observation());
    assert!(!ProductCategory::Sinex.is_observation());
}
