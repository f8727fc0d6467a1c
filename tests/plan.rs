use gnss_archive_fetch::config::{Config, ConfigLoader};
use gnss_archive_fetch::domain::{Archive, DcbPair, ProductCategory, ProductRequest, Subject};
use gnss_archive_fetch::plan::{build_requests, ultra_sessions};

fn plan(json: &str) -> Vec<ProductRequest> {
    let config: Config = serde_json::from_str(json).unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    build_requests(&resolved).unwrap()
}

#[test]
fn union_source_expands_per_site() {
    let requests = plan(
        r#"{ "start": "2021-006", "observations": { "source": "igm", "sites": ["abpo", "algo"] } }"#,
    );
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.category, ProductCategory::ObservationDaily);
        assert_eq!(request.archive, Archive::Mgex);
        assert_eq!(request.union_with, Some(Archive::Igs));
    }
    assert_eq!(requests[1].site().unwrap().as_str(), "algo");
}

#[test]
fn highrate_splits_hours_into_quarters() {
    let requests = plan(
        r#"{ "start": "2021-006", "observations": { "kind": "highrate", "source": "mgex", "sites": ["abpo"], "start_hour": 5, "hours": 1 } }"#,
    );
    let slots = requests
        .iter()
        .map(|request| (request.epoch.hour(), request.epoch.minute()))
        .collect::<Vec<_>>();
    assert_eq!(
        slots,
        vec![
            (Some(5), Some(0)),
            (Some(5), Some(15)),
            (Some(5), Some(30)),
            (Some(5), Some(45))
        ]
    );
}

#[test]
fn hourly_window_is_clipped_to_the_day() {
    let requests = plan(
        r#"{ "start": "2021-006", "observations": { "kind": "hourly", "source": "igs", "sites": ["abpo"], "start_hour": 22, "hours": 5 } }"#,
    );
    let hours = requests
        .iter()
        .filter_map(|request| request.epoch.hour())
        .collect::<Vec<_>>();
    assert_eq!(hours, vec![22, 23]);
}

#[test]
fn adjacent_days_are_deduplicated() {
    let requests = plan(
        r#"{ "start": "2021-006", "ndays": 2, "adjacent_days": true, "orbit_clock": "cod" }"#,
    );
    assert_eq!(requests.len(), 8);
    let mut orbit_days = requests
        .iter()
        .filter(|request| request.category == ProductCategory::PreciseOrbit)
        .map(|request| request.epoch.doy())
        .collect::<Vec<_>>();
    orbit_days.sort_unstable();
    assert_eq!(orbit_days, vec![5, 6, 7, 8]);
}

#[test]
fn ultra_rapid_yields_orbit_sessions_only() {
    let requests = plan(r#"{ "start": "2021-006", "orbit_clock": "igs_u" }"#);
    assert!(
        requests
            .iter()
            .all(|request| request.category == ProductCategory::PreciseOrbit)
    );
    let hours = requests
        .iter()
        .filter_map(|request| request.epoch.hour())
        .collect::<Vec<_>>();
    assert_eq!(hours, vec![0, 6, 12, 18]);
    assert_eq!(ultra_sessions(1, 0, 3), vec![0, 1, 2]);
}

#[test]
fn weekly_products_collapse_onto_week_start() {
    let requests = plan(r#"{ "start": "2021-003", "ndays": 7, "eop": "igs", "sinex": true }"#);
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.epoch.doy(), 3);
        assert_eq!(request.epoch.gps_week(), 2139);
    }
}

#[test]
fn center_products_route_to_home_archive() {
    let requests = plan(
        r#"{ "start": "2021-006", "osb": "cnt", "attitude": "cod_m", "troposphere": { "center": "cod", "sites": ["abpo"] } }"#,
    );
    let routes = requests
        .iter()
        .map(|request| (request.category, request.archive))
        .collect::<Vec<_>>();
    assert_eq!(
        routes,
        vec![
            (ProductCategory::AttitudeExchange, Archive::Mgex),
            (ProductCategory::BiasOsb, Archive::Cnes),
            (ProductCategory::Troposphere, Archive::Code),
            (ProductCategory::Troposphere, Archive::Igs),
        ]
    );
}

#[test]
fn antenna_is_requested_once() {
    let requests = plan(r#"{ "start": "2021-006", "ndays": 3, "antenna": true }"#);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].category, ProductCategory::AntennaExchange);
    assert_eq!(requests[0].subject, Subject::Global);
    assert_eq!(requests[0].archive, Archive::IgsCentral);
}

#[test]
fn per_site_navigation() {
    let requests = plan(
        r#"{ "start": "2021-006", "navigation": { "system": "gps", "sites": ["abpo", "algo"] } }"#,
    );
    assert_eq!(requests.len(), 2);
    assert!(
        requests
            .iter()
            .all(|request| request.category == ProductCategory::BroadcastEphemeris)
    );
}

#[test]
fn ultra_rapid_sessions_ignore_the_observation_window() {
    let requests = plan(
        r#"{
            "start": "2021-006",
            "observations": { "kind": "hourly", "source": "igs", "sites": ["abpo"], "start_hour": 5, "hours": 1 },
            "orbit_clock": "igs_u"
        }"#,
    );
    let orbit_hours = requests
        .iter()
        .filter(|request| request.category == ProductCategory::PreciseOrbit)
        .filter_map(|request| request.epoch.hour())
        .collect::<Vec<_>>();
    assert_eq!(orbit_hours, vec![0, 6, 12, 18]);
    let observation_hours = requests
        .iter()
        .filter(|request| request.category == ProductCategory::ObservationHourly)
        .filter_map(|request| request.epoch.hour())
        .collect::<Vec<_>>();
    assert_eq!(observation_hours, vec![5]);
}

#[test]
fn orbit_and_eop_windows_are_independent() {
    let requests = plan(
        r#"{
            "start": "2021-006",
            "orbit_clock": { "centers": "igs_u+gfz_u", "start_hour": 5, "hours": 7 },
            "eop": { "centers": "igs_u", "start_hour": 18 }
        }"#,
    );
    let sessions = |category| {
        requests
            .iter()
            .filter(|request| request.category == category)
            .map(|request| (request.subject.to_string(), request.epoch.hour().unwrap()))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        sessions(ProductCategory::PreciseOrbit),
        vec![
            ("igs_u".to_string(), 6),
            ("gfz_u".to_string(), 6),
            ("gfz_u".to_string(), 9),
        ]
    );
    assert_eq!(
        sessions(ProductCategory::EarthOrientation),
        vec![("igs_u".to_string(), 18)]
    );
}

#[test]
fn hourly_navigation_expands_per_site_and_hour() {
    let requests = plan(
        r#"{
            "start": "2021-006",
            "navigation": { "kind": "hourly", "system": "mixed", "source": "mgex", "sites": ["abpo", "algo"], "start_hour": 22, "hours": 4 }
        }"#,
    );
    let slots = requests
        .iter()
        .map(|request| (request.site().unwrap().to_string(), request.epoch.hour().unwrap()))
        .collect::<Vec<_>>();
    assert_eq!(
        slots,
        vec![
            ("abpo".to_string(), 22),
            ("abpo".to_string(), 23),
            ("algo".to_string(), 22),
            ("algo".to_string(), 23),
        ]
    );
    assert!(requests.iter().all(|request| request.archive == Archive::Mgex));
}

#[test]
fn all_aliases_expand_into_center_requests() {
    let requests = plan(r#"{ "start": "2021-006", "orbit_clock": "all", "ionosphere": "all_r" }"#);
    let orbit_centers = requests
        .iter()
        .filter(|request| request.category == ProductCategory::PreciseOrbit)
        .count();
    assert_eq!(orbit_centers, 8);
    let gims = requests
        .iter()
        .filter(|request| request.category == ProductCategory::IonosphereMap)
        .map(|request| request.subject.to_string())
        .collect::<Vec<_>>();
    assert_eq!(gims, vec!["cas_r", "cod_r", "esa_r", "igs_r", "jpl_r", "upc_r"]);
}

#[test]
fn code_dcb_is_monthly_per_signal_pair() {
    let requests = plan(r#"{ "start": "2021-059", "ndays": 3, "dsb": "all" }"#);
    let code = requests
        .iter()
        .filter(|request| request.archive == Archive::Code)
        .map(|request| (request.epoch.month(), request.epoch.date().format("%d").to_string(), request.dcb_pair))
        .collect::<Vec<_>>();
    assert_eq!(
        code,
        vec![
            (2, "01".to_string(), Some(DcbPair::P1C1)),
            (2, "01".to_string(), Some(DcbPair::P1P2)),
            (2, "01".to_string(), Some(DcbPair::P2C2)),
            (3, "01".to_string(), Some(DcbPair::P1C1)),
            (3, "01".to_string(), Some(DcbPair::P1P2)),
            (3, "01".to_string(), Some(DcbPair::P2C2)),
        ]
    );
    let cas = requests
        .iter()
        .filter(|request| request.archive == Archive::Igs)
        .count();
    assert_eq!(cas, 3);
}
