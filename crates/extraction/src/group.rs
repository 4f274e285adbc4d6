//! Observation grouping.
//!
//! Every segment file names the observation it belongs to. Grouping
//! buckets the local artifacts by that instant so each observation can be
//! decoded as one scene, whatever subset of its bands and segments happens
//! to be present.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use himawari_common::{parse_artifact_name, ArtifactName, Band, ObservationTime, ProductSpec};
use storage::LocalArtifactStore;

use crate::error::ExtractionResult;

/// Inclusive range of UTC dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One local artifact of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub name: ArtifactName,
    pub path: PathBuf,
}

/// All local artifacts of one observation instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationGroup {
    pub time: ObservationTime,
    /// Sorted by (band, segment)
    pub members: Vec<GroupMember>,
}

impl ObservationGroup {
    /// `YYYYMMDD_hhmm`
    pub fn key(&self) -> String {
        self.time.group_key()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Bands with at least one segment present.
    pub fn bands(&self) -> BTreeSet<Band> {
        self.members.iter().map(|m| m.name.band).collect()
    }

    /// Members belonging to any of `bands`.
    pub fn members_for<'a>(&'a self, bands: &'a [Band]) -> impl Iterator<Item = &'a GroupMember> + 'a {
        self.members
            .iter()
            .filter(move |m| bands.contains(&m.name.band))
    }
}

/// Group filenames found under `root`, ascending by observation time.
///
/// Names that do not follow the artifact naming convention of `product`
/// are ignored, as are observations outside `range`.
pub fn group_filenames<I, S>(
    root: &Path,
    names: I,
    product: &ProductSpec,
    range: Option<DateRange>,
) -> Vec<ObservationGroup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<ObservationTime, Vec<GroupMember>> = BTreeMap::new();

    for name in names {
        let name = name.as_ref();
        let parsed = match parse_artifact_name(name) {
            Some(parsed) if parsed.matches(product) => parsed,
            _ => {
                debug!(file = %name, "Ignoring file outside naming convention");
                continue;
            }
        };
        if let Some(range) = range {
            if !range.contains(parsed.time.date()) {
                continue;
            }
        }
        groups.entry(parsed.time).or_default().push(GroupMember {
            path: root.join(name),
            name: parsed,
        });
    }

    groups
        .into_iter()
        .map(|(time, mut members)| {
            members.sort_by_key(|m| (m.name.band, m.name.segment));
            ObservationGroup { time, members }
        })
        .collect()
}

/// Group every artifact in a local store.
pub fn scan_groups(
    store: &LocalArtifactStore,
    product: &ProductSpec,
    range: Option<DateRange>,
) -> ExtractionResult<Vec<ObservationGroup>> {
    let names = store.list()?;
    let groups = group_filenames(store.root(), names, product, range);
    debug!(root = %store.root().display(), groups = groups.len(), "Scanned local artifacts");
    Ok(groups)
}
