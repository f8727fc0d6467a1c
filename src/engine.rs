use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, PoisonError};
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::ArchiveCatalog;
use crate::convert;
use crate::domain::{Archive, ProductRequest};
use crate::error::GnssError;
use crate::fetcher::{self, Fetched, Leftover};
use crate::report::{FetchOutcome, OutcomeSink};
use crate::resolver::{self, NameSet, Resolution};
use crate::store::Store;
use crate::tools::{Converter, Decompressor, Fetcher};

/// What a fetch would do, computed without network or disk writes.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFetch {
    pub request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<Utf8PathBuf>,
    pub already_satisfied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Engine<F: Fetcher, D: Decompressor, C: Converter> {
    catalog: ArchiveCatalog,
    store: Store,
    fetcher: F,
    decompressor: D,
    converter: C,
}

impl<F: Fetcher, D: Decompressor, C: Converter> Engine<F, D, C> {
    pub fn new(catalog: ArchiveCatalog, store: Store, fetcher: F, decompressor: D, converter: C) -> Self {
        Self {
            catalog,
            store,
            fetcher,
            decompressor,
            converter,
        }
    }

    pub fn catalog(&self) -> &ArchiveCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Runs the whole pipeline for one request and reports the outcome to
    /// `sink` exactly once. Failures are outcomes, never errors.
    pub fn acquire(&self, request: &ProductRequest, sink: &dyn OutcomeSink) -> FetchOutcome {
        let outcome = catch_unwind(AssertUnwindSafe(|| match request.union_with {
            Some(secondary) => self.acquire_union(request, secondary),
            None => self.acquire_single(request),
        }))
        .unwrap_or_else(|_| {
            FetchOutcome::failed(
                String::new(),
                self.store.deliverable_dir(request),
                "internal error while processing request".to_string(),
            )
        });
        sink.report(request, &outcome);
        outcome
    }

    pub fn acquire_all(&self, requests: &[ProductRequest], sink: &dyn OutcomeSink) -> Vec<FetchOutcome> {
        requests
            .iter()
            .map(|request| self.acquire(request, sink))
            .collect()
    }

    /// Spreads requests over up to `jobs` workers. All requests sharing a
    /// destination directory go to the same worker, in input order, so no
    /// two workers ever probe or clean the same directory. Outcomes come back
    /// in input order.
    pub fn acquire_all_parallel(
        &self,
        requests: &[ProductRequest],
        jobs: usize,
        sink: &dyn OutcomeSink,
    ) -> Vec<FetchOutcome> {
        if jobs <= 1 || requests.len() <= 1 {
            return self.acquire_all(requests, sink);
        }

        let mut by_dir: BTreeMap<Utf8PathBuf, Vec<usize>> = BTreeMap::new();
        for (index, request) in requests.iter().enumerate() {
            by_dir
                .entry(self.store.deliverable_dir(request))
                .or_default()
                .push(index);
        }
        let mut lanes: Vec<Vec<usize>> = vec![Vec::new(); jobs.min(by_dir.len())];
        for (slot, group) in by_dir.into_values().enumerate() {
            let lane = slot % lanes.len();
            lanes[lane].extend(group);
        }

        let done: Mutex<Vec<Option<FetchOutcome>>> = Mutex::new(vec![None; requests.len()]);
        thread::scope(|scope| {
            let handles = lanes
                .iter()
                .map(|lane| {
                    let done = &done;
                    scope.spawn(move || {
                        for &index in lane {
                            let outcome = self.acquire(&requests[index], sink);
                            if let Ok(mut done) = done.lock() {
                                done[index] = Some(outcome);
                            }
                        }
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                if handle.join().is_err() {
                    warn!("fetch worker panicked; its remaining requests are marked failed");
                }
            }
        });

        // A slot stays empty only when a sink panicked and took its worker down.
        let done = done.into_inner().unwrap_or_else(PoisonError::into_inner);
        done.into_iter()
            .zip(requests)
            .map(|(outcome, request)| outcome.unwrap_or_else(|| self.lane_lost(request, sink)))
            .collect()
    }

    pub fn preview(&self, request: &ProductRequest) -> PlannedFetch {
        let dir = self.store.deliverable_dir(request);
        match resolver::resolve(&self.catalog, request) {
            Ok(resolution) => PlannedFetch {
                request: request.to_string(),
                url: Some(resolution.requested_url()),
                local_path: Some(Store::canonical_path(&dir, &resolution.names)),
                already_satisfied: Store::already_satisfied(&dir, &resolution.names),
                error: None,
            },
            Err(err) => PlannedFetch {
                request: request.to_string(),
                url: None,
                local_path: None,
                already_satisfied: false,
                error: Some(err.to_string()),
            },
        }
    }

    fn lane_lost(&self, request: &ProductRequest, sink: &dyn OutcomeSink) -> FetchOutcome {
        let outcome = FetchOutcome::failed(
            String::new(),
            self.store.deliverable_dir(request),
            "worker stopped before reporting".to_string(),
        );
        let _ = catch_unwind(AssertUnwindSafe(|| sink.report(request, &outcome)));
        outcome
    }

    fn acquire_single(&self, request: &ProductRequest) -> FetchOutcome {
        let dir = self.store.deliverable_dir(request);
        let resolution = match resolver::resolve(&self.catalog, request) {
            Ok(resolution) => resolution,
            Err(err) => return FetchOutcome::failed(String::new(), dir, err.to_string()),
        };
        let url = resolution.requested_url();
        let local = Store::canonical_path(&dir, &resolution.names);
        if Store::already_satisfied(&dir, &resolution.names) {
            debug!(path = %local, "phase=Guard; already present");
            return FetchOutcome::already_existed(url, local);
        }
        match self.run_pipeline(&resolution, &dir, Leftover::Reuse) {
            Ok(fetched) if fetched.reused => {
                FetchOutcome::reconverted(url, local, Some(request.archive))
            }
            Ok(fetched) => FetchOutcome::succeeded(url, local, fetched.used_suffix, request.archive),
            Err(err) => FetchOutcome::failed(url, local, err.to_string()),
        }
    }

    /// Primary archive first; the secondary is only contacted when the
    /// primary delivered nothing. A side whose download succeeded but whose
    /// conversion failed ends the union: its intermediate is kept and the
    /// other archive must not overwrite it.
    fn acquire_union(&self, request: &ProductRequest, secondary: Archive) -> FetchOutcome {
        let dir = self.store.deliverable_dir(request);
        let sides = [request.archive, secondary].map(|archive| {
            let retargeted = request.retargeted(archive);
            (archive, resolver::resolve(&self.catalog, &retargeted))
        });
        let resolved = sides
            .iter()
            .filter_map(|(_, resolution)| resolution.as_ref().ok())
            .collect::<Vec<_>>();

        for resolution in &resolved {
            if Store::already_satisfied(&dir, &resolution.names) {
                let local = Store::canonical_path(&dir, &resolution.names);
                debug!(path = %local, "phase=Guard; already present");
                return FetchOutcome::already_existed(resolution.requested_url(), local);
            }
        }
        // Either side may have left it; which one is not recorded.
        if let Some(resolution) = resolved.iter().find(|resolution| {
            resolution.names.requires_conversion()
                && Store::exists_after(&dir.join(&resolution.names.intermediate_name))
        }) {
            let url = resolution.requested_url();
            let local = Store::canonical_path(&dir, &resolution.names);
            debug!(path = %local, "phase=Union; converting leftover intermediate");
            return match self.convert_checked(&resolution.names, &dir) {
                Ok(()) => FetchOutcome::reconverted(url, local, None),
                Err(err) => FetchOutcome::failed(url, local, err.to_string()),
            };
        }

        let mut failures = Vec::new();
        let mut first_url = None;
        let mut first_local = None;
        for (archive, resolution) in &sides {
            let resolution = match resolution {
                Ok(resolution) => resolution,
                Err(err) => {
                    failures.push(format!("{archive}: {err}"));
                    continue;
                }
            };
            let url = resolution.requested_url();
            let local = Store::canonical_path(&dir, &resolution.names);
            first_url.get_or_insert_with(|| url.clone());
            first_local.get_or_insert_with(|| local.clone());
            debug!(%archive, %url, "phase=Union; attempting");
            match self.run_pipeline(resolution, &dir, Leftover::Replace) {
                Ok(fetched) => {
                    return FetchOutcome::succeeded(url, local, fetched.used_suffix, *archive);
                }
                Err(err @ GnssError::ConversionFailed { .. }) => {
                    failures.push(format!("{archive}: {err}"));
                    return FetchOutcome::failed(url, local, failures.join("; "));
                }
                Err(err) => failures.push(format!("{archive}: {err}")),
            }
        }

        FetchOutcome::failed(
            first_url.unwrap_or_default(),
            first_local.unwrap_or(dir),
            failures.join("; "),
        )
    }

    fn run_pipeline(
        &self,
        resolution: &Resolution,
        dir: &Utf8Path,
        leftover: Leftover,
    ) -> Result<Fetched, GnssError> {
        Store::ensure_dir(dir)?;
        let fetched = fetcher::fetch_with_fallback(
            &self.fetcher,
            &self.decompressor,
            resolution,
            dir,
            leftover,
        )?;
        self.convert_checked(&resolution.names, dir)?;
        Ok(fetched)
    }

    /// Conversion when the product needs it, then the final existence check.
    fn convert_checked(&self, names: &NameSet, dir: &Utf8Path) -> Result<(), GnssError> {
        if names.requires_conversion() {
            convert::convert(&self.converter, dir, names)?;
        }
        let local = Store::canonical_path(dir, names);
        if !Store::exists_after(&local) {
            return Err(GnssError::Filesystem(format!("{local} missing after processing")));
        }
        Ok(())
    }
}
