//! Expands a resolved configuration into the concrete list of requests.

use std::collections::HashSet;

use crate::config::{
    HourWindow, NavigationKind, NavigationPlan, ObservationKind, ObservationPlan,
    ObservationSource, ResolvedConfig,
};
use crate::domain::{
    AnalysisCenter, Archive, CenterCode, DcbPair, ProductCategory, ProductLine, ProductRequest,
    Subject,
};
use crate::epoch::Epoch;
use crate::error::GnssError;

const HIGHRATE_MINUTES: [u32; 4] = [0, 15, 30, 45];

/// Requests in a stable order: day by day, product family by family, with
/// duplicates (such as adjacent days of neighbouring dates) removed.
pub fn build_requests(config: &ResolvedConfig) -> Result<Vec<ProductRequest>, GnssError> {
    let mut requests = Vec::new();
    for offset in 0..config.ndays {
        let day = config.start.add_days(i64::from(offset))?;

        if let Some(plan) = &config.observations {
            observation_requests(plan, day, &mut requests)?;
        }
        if let Some(nav) = &config.navigation {
            navigation_requests(nav, day, &mut requests)?;
        }

        let orbit_window = config.orbit_clock.window;
        for center in &config.orbit_clock.centers {
            let days = if config.adjacent_days {
                vec![day.add_days(-1)?, day, day.add_days(1)?]
            } else {
                vec![day]
            };
            for date in days {
                for category in [ProductCategory::PreciseOrbit, ProductCategory::PreciseClock] {
                    if center.line == ProductLine::UltraRapid
                        && category == ProductCategory::PreciseClock
                    {
                        continue;
                    }
                    center_requests(category, *center, date, orbit_window, &mut requests)?;
                }
            }
        }
        for center in &config.eop.centers {
            let date = if center.line == ProductLine::Final {
                day.week_start()
            } else {
                day
            };
            center_requests(
                ProductCategory::EarthOrientation,
                *center,
                date,
                config.eop.window,
                &mut requests,
            )?;
        }
        for center in &config.dsb {
            dsb_requests(*center, day, &mut requests)?;
        }
        for (category, list) in [
            (ProductCategory::AttitudeExchange, &config.attitude),
            (ProductCategory::BiasOsb, &config.osb),
            (ProductCategory::IonosphereMap, &config.ionosphere),
        ] {
            for center in list {
                requests.push(center_request(category, *center, day));
            }
        }
        if config.sinex {
            requests.push(ProductRequest::new(
                ProductCategory::Sinex,
                day.week_start(),
                Subject::Global,
                Archive::Igs,
            ));
        }
        if config.roti {
            requests.push(ProductRequest::new(
                ProductCategory::Roti,
                day,
                Subject::Global,
                Archive::Igs,
            ));
        }
        if let Some(tropo) = &config.troposphere {
            for center in &tropo.centers {
                requests.push(center_request(ProductCategory::Troposphere, *center, day));
            }
            for site in &tropo.sites {
                requests.push(ProductRequest::new(
                    ProductCategory::Troposphere,
                    day,
                    Subject::Site(site.clone()),
                    Archive::Igs,
                ));
            }
        }
    }

    if config.antenna {
        requests.push(ProductRequest::new(
            ProductCategory::AntennaExchange,
            config.start,
            Subject::Global,
            Archive::IgsCentral,
        ));
    }

    let mut seen = HashSet::new();
    requests.retain(|request| seen.insert(request.clone()));
    Ok(requests)
}

fn center_request(category: ProductCategory, center: AnalysisCenter, day: Epoch) -> ProductRequest {
    ProductRequest::new(
        category,
        day,
        Subject::Center(center),
        center.home_archive(category),
    )
}

/// Daily products yield one request; ultra-rapid products one per session
/// inside the hour window.
fn center_requests(
    category: ProductCategory,
    center: AnalysisCenter,
    day: Epoch,
    window: HourWindow,
    out: &mut Vec<ProductRequest>,
) -> Result<(), GnssError> {
    if center.line != ProductLine::UltraRapid {
        out.push(center_request(category, center, day));
        return Ok(());
    }
    for hour in ultra_sessions(center.session_step(), window.start_hour, window.hours) {
        out.push(center_request(category, center, day.with_hour(hour)?));
    }
    Ok(())
}

/// Session hours from the first one at or after `start_hour`, while still
/// inside `start_hour + hours` and the same day.
pub fn ultra_sessions(step: u32, start_hour: u32, hours: u32) -> Vec<u32> {
    let end = (start_hour + hours).min(24);
    let first = start_hour.div_ceil(step) * step;
    (first..end).step_by(step as usize).collect()
}

/// CODE publishes monthly files, one per signal pair; they are keyed on the
/// first of the month so every day of a month maps onto the same requests.
fn dsb_requests(
    center: AnalysisCenter,
    day: Epoch,
    out: &mut Vec<ProductRequest>,
) -> Result<(), GnssError> {
    if center.code != CenterCode::Cod {
        out.push(center_request(ProductCategory::BiasDsb, center, day));
        return Ok(());
    }
    let month = day.month_start()?;
    for pair in DcbPair::ALL {
        out.push(center_request(ProductCategory::BiasDsb, center, month).with_dcb_pair(pair));
    }
    Ok(())
}

fn navigation_requests(
    nav: &NavigationPlan,
    day: Epoch,
    out: &mut Vec<ProductRequest>,
) -> Result<(), GnssError> {
    let request = |epoch, subject| {
        ProductRequest::new(ProductCategory::BroadcastEphemeris, epoch, subject, nav.source)
            .with_nav_system(nav.system)
    };
    match nav.kind {
        NavigationKind::Daily => {
            if nav.sites.is_empty() {
                out.push(request(day, Subject::Center(nav.center)));
            }
            for site in &nav.sites {
                out.push(request(day, Subject::Site(site.clone())));
            }
        }
        NavigationKind::Hourly => {
            for site in &nav.sites {
                for hour in nav.window.range() {
                    out.push(request(day.with_hour(hour)?, Subject::Site(site.clone())));
                }
            }
        }
    }
    Ok(())
}

fn observation_requests(
    plan: &ObservationPlan,
    day: Epoch,
    out: &mut Vec<ProductRequest>,
) -> Result<(), GnssError> {
    let (category, epochs) = match plan.kind {
        ObservationKind::Daily => (ProductCategory::ObservationDaily, vec![day]),
        ObservationKind::Hourly => {
            let mut epochs = Vec::new();
            for hour in plan.window.range() {
                epochs.push(day.with_hour(hour)?);
            }
            (ProductCategory::ObservationHourly, epochs)
        }
        ObservationKind::Highrate => {
            let mut epochs = Vec::new();
            for hour in plan.window.range() {
                for minute in HIGHRATE_MINUTES {
                    epochs.push(day.with_hour(hour)?.with_minute(minute)?);
                }
            }
            (ProductCategory::ObservationHighrate, epochs)
        }
    };

    for site in &plan.sites {
        for epoch in &epochs {
            let subject = Subject::Site(site.clone());
            let request = match plan.source {
                ObservationSource::Single(archive) => {
                    ProductRequest::new(category, *epoch, subject, archive)
                }
                ObservationSource::Union { primary, secondary } => {
                    ProductRequest::new(category, *epoch, subject, primary).with_union(secondary)
                }
            };
            out.push(request);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ultra_sessions_round_up_to_step() {
        assert_eq!(ultra_sessions(6, 0, 24), vec![0, 6, 12, 18]);
        assert_eq!(ultra_sessions(6, 5, 8), vec![6, 12]);
        assert_eq!(ultra_sessions(3, 20, 24), vec![21]);
        assert!(ultra_sessions(6, 19, 2).is_empty());
    }
}
