//! Extraction pipeline driver.
//!
//! Groups are processed one at a time in ascending time order. For each
//! group: decompress into a fresh workspace, decode, resolve the point,
//! read every band, append a record, remove the workspace.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::FixedOffset;
use metrics::counter;
use tracing::{error, info, instrument, warn};

use himawari_common::{Band, DecodeFailurePolicy, RunConfig};

use crate::aggregate::{ObservationRecord, ResultTable};
use crate::decode::{DecodeError, SceneDecoder};
use crate::error::{ExtractionError, ExtractionResult};
use crate::extract::{extract_point, geolocate};
use crate::group::{DateRange, ObservationGroup};
use crate::workspace::Workspace;

/// Everything the extractor needs from a run configuration.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub bands: Vec<Band>,
    pub latitude: f64,
    pub longitude: f64,
    pub celsius: bool,
    pub local_offset: FixedOffset,
    pub decode_failure: DecodeFailurePolicy,
    pub work_root: PathBuf,
    pub range: Option<DateRange>,
}

impl ExtractionOptions {
    pub fn from_config(config: &RunConfig) -> ExtractionResult<Self> {
        let local_offset = config.local_offset().ok_or_else(|| {
            ExtractionError::InvalidConfig(format!(
                "local offset of {} hours",
                config.output.local_offset_hours
            ))
        })?;
        Ok(Self {
            bands: config.bands.clone(),
            latitude: config.target.latitude,
            longitude: config.target.longitude,
            celsius: config.output.celsius,
            local_offset,
            decode_failure: config.output.decode_failure,
            work_root: config.storage.work_root(),
            range: Some(DateRange {
                start: config.period.start,
                end: config.period.end,
            }),
        })
    }
}

/// Result of processing one group.
#[derive(Debug)]
pub enum GroupOutcome {
    Extracted(ObservationRecord),
    DecodeFailed(DecodeError),
}

/// Totals of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub groups: usize,
    /// Records with at least one value
    pub extracted: usize,
    /// Records where every band is missing
    pub all_missing: usize,
    pub decode_failed: usize,
    /// Groups abandoned for environmental errors (workspace creation, I/O)
    pub errors: usize,
    pub cancelled: bool,
}

/// Sequential extraction over observation groups.
pub struct Extractor<D> {
    decoder: D,
    options: ExtractionOptions,
}

impl<D: SceneDecoder> Extractor<D> {
    pub fn new(decoder: D, options: ExtractionOptions) -> Self {
        Self { decoder, options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Process one group. The workspace is removed before this returns,
    /// whatever the outcome.
    #[instrument(skip(self, group, cancel), fields(group = %group.key(), files = group.len()))]
    pub fn process_group(
        &self,
        group: &ObservationGroup,
        cancel: &AtomicBool,
    ) -> ExtractionResult<GroupOutcome> {
        let opts = &self.options;
        let mut workspace = Workspace::create(&opts.work_root, &group.key())?;

        let sources = group.members_for(&opts.bands).map(|m| m.path.as_path());
        workspace.populate(sources, cancel)?;

        // Nothing of the requested bands to hand to the decoder
        if workspace.files().is_empty() {
            return Ok(GroupOutcome::DecodeFailed(DecodeError::NoBands));
        }

        let scene = match self
            .decoder
            .decode(workspace.files(), &opts.bands, workspace.dir(), cancel)
        {
            Ok(scene) => scene,
            // An interrupted decoder says nothing about the data
            Err(_) if cancel.load(Ordering::Relaxed) => return Err(ExtractionError::Cancelled),
            Err(DecodeError::Cancelled) => return Err(ExtractionError::Cancelled),
            Err(e) => return Ok(GroupOutcome::DecodeFailed(e)),
        };

        let location = match geolocate(&scene, &opts.bands, opts.latitude, opts.longitude) {
            Ok(location) => location,
            Err(e) => return Ok(GroupOutcome::DecodeFailed(e)),
        };
        if location.index.is_none() {
            warn!("Point is not visible from the satellite");
        }

        let values = extract_point(&scene, &opts.bands, location.index, opts.celsius);

        if let Err(e) = workspace.close() {
            warn!(error = %e, "Failed to remove workspace");
        }

        Ok(GroupOutcome::Extracted(ObservationRecord::new(
            group.time,
            opts.local_offset,
            opts.latitude,
            opts.longitude,
            values,
        )))
    }

    /// Process every group in order until done or `cancel` is set.
    pub fn run<I>(&self, groups: I, cancel: &AtomicBool) -> (ResultTable, RunSummary)
    where
        I: IntoIterator<Item = ObservationGroup>,
    {
        let opts = &self.options;
        let mut table = ResultTable::new(opts.bands.clone());
        let mut summary = RunSummary::default();

        for group in groups {
            if cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }
            summary.groups += 1;

            let record = match self.process_group(&group, cancel) {
                Ok(GroupOutcome::Extracted(record)) => {
                    if record.missing_count() == record.values.len() {
                        summary.all_missing += 1;
                        counter!("himawari_groups_total", "outcome" => "all_missing").increment(1);
                    } else {
                        summary.extracted += 1;
                        counter!("himawari_groups_total", "outcome" => "extracted").increment(1);
                    }
                    record
                }
                Ok(GroupOutcome::DecodeFailed(e)) => {
                    summary.decode_failed += 1;
                    counter!("himawari_groups_total", "outcome" => "decode_failed").increment(1);
                    warn!(group = %group.key(), error = %e, "Decode failed");
                    match opts.decode_failure {
                        DecodeFailurePolicy::Skip => continue,
                        DecodeFailurePolicy::EmitMissing => ObservationRecord::new(
                            group.time,
                            opts.local_offset,
                            opts.latitude,
                            opts.longitude,
                            vec![None; opts.bands.len()],
                        ),
                    }
                }
                Err(ExtractionError::Cancelled) => {
                    summary.groups -= 1;
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    summary.errors += 1;
                    counter!("himawari_groups_total", "outcome" => "error").increment(1);
                    error!(group = %group.key(), error = %e, "Group processing failed");
                    continue;
                }
            };

            if let Err(e) = table.append(record) {
                warn!(group = %group.key(), error = %e, "Record not added");
            }
        }

        info!(
            groups = summary.groups,
            extracted = summary.extracted,
            all_missing = summary.all_missing,
            decode_failed = summary.decode_failed,
            errors = summary.errors,
            cancelled = summary.cancelled,
            rows = table.len(),
            "Extraction run complete"
        );
        (table, summary)
    }
}
