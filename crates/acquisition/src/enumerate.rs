//! Key-space enumeration.
//!
//! A run covers every (date, time of day, band, segment) combination in the
//! configured period. The sequence is produced lazily in ascending order and
//! depends only on its parameters, so an interrupted run enumerates exactly
//! the same keys when restarted.

use chrono::{Duration, NaiveDate, NaiveTime};

use himawari_common::{Band, ObjectKey, ObservationTime, RunConfig, Segment, TimeWindow};

use crate::error::{AcquisitionError, AcquisitionResult};

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct KeySpace {
    start: NaiveDate,
    end: NaiveDate,
    times: Vec<NaiveTime>,
    bands: Vec<Band>,
    segments: Vec<Segment>,
}

impl KeySpace {
    /// Build a key space. Bands and segments are sorted and deduplicated.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        cadence_minutes: u32,
        window: Option<TimeWindow>,
        bands: impl IntoIterator<Item = Band>,
        segments: impl IntoIterator<Item = Segment>,
    ) -> AcquisitionResult<Self> {
        if start > end {
            return Err(AcquisitionError::InvalidKeySpace(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        if cadence_minutes == 0 || MINUTES_PER_DAY % cadence_minutes != 0 {
            return Err(AcquisitionError::InvalidKeySpace(format!(
                "cadence of {} minutes does not divide a day",
                cadence_minutes
            )));
        }

        let times = (0..MINUTES_PER_DAY)
            .step_by(cadence_minutes as usize)
            .filter_map(|m| NaiveTime::from_hms_opt(m / 60, m % 60, 0))
            .filter(|t| window.map_or(true, |w| w.contains(*t)))
            .collect();

        let mut bands: Vec<Band> = bands.into_iter().collect();
        bands.sort();
        bands.dedup();

        let mut segments: Vec<Segment> = segments.into_iter().collect();
        segments.sort();
        segments.dedup();

        Ok(Self {
            start,
            end,
            times,
            bands,
            segments,
        })
    }

    /// Key space of a validated run configuration. An empty segment list
    /// means every segment of the product.
    pub fn from_config(config: &RunConfig) -> AcquisitionResult<Self> {
        let segments = if config.segments.is_empty() {
            Segment::all(config.product.segment_total)
        } else {
            config.segments.clone()
        };
        Self::new(
            config.period.start,
            config.period.end,
            config.period.cadence_minutes,
            config.period.window,
            config.bands.iter().copied(),
            segments,
        )
    }

    pub fn days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of keys, computed without iterating.
    pub fn len(&self) -> usize {
        self.days() * self.times.len() * self.bands.len() * self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every observation instant in the period, ascending.
    pub fn instants(&self) -> impl Iterator<Item = ObservationTime> + '_ {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.checked_add_signed(Duration::days(1)))
            .take_while(move |d| *d <= end)
            .flat_map(move |date| {
                self.times
                    .iter()
                    .map(move |time| ObservationTime::new(date, *time))
            })
    }

    /// Every key in ascending (date, time, band, segment) order.
    pub fn iter(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.instants().flat_map(move |time| {
            self.bands.iter().flat_map(move |band| {
                self.segments
                    .iter()
                    .map(move |segment| ObjectKey::new(time, *band, *segment))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bands(numbers: &[u8]) -> Vec<Band> {
        numbers.iter().map(|n| Band::new(*n).unwrap()).collect()
    }

    fn segments(numbers: &[u8]) -> Vec<Segment> {
        numbers.iter().map(|n| Segment::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_full_day_size() {
        let space = KeySpace::new(
            date(2025, 3, 1),
            date(2025, 3, 1),
            10,
            None,
            bands(&[14, 15]),
            Segment::all(10),
        )
        .unwrap();
        assert_eq!(space.len(), 144 * 2 * 10);
        assert_eq!(space.iter().count(), space.len());
    }

    #[test]
    fn test_ascending_order_regardless_of_input_order() {
        let space = KeySpace::new(
            date(2025, 3, 1),
            date(2025, 3, 2),
            10,
            None,
            bands(&[15, 14, 15]),
            segments(&[2, 1]),
        )
        .unwrap();
        assert_eq!(space.bands(), &bands(&[14, 15])[..]);

        let keys: Vec<ObjectKey> = space.iter().collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        let first = keys[0];
        assert_eq!(first.time.group_key(), "20250301_0000");
        assert_eq!(first.band.number(), 14);
        assert_eq!(first.segment.number(), 1);

        let second = keys[1];
        assert_eq!(second.time, first.time);
        assert_eq!(second.band, first.band);
        assert_eq!(second.segment.number(), 2);

        let last = keys[keys.len() - 1];
        assert_eq!(last.time.group_key(), "20250302_2350");
        assert_eq!(last.band.number(), 15);
        assert_eq!(last.segment.number(), 2);
    }

    #[test]
    fn test_deterministic_and_restartable() {
        let make = || {
            KeySpace::new(
                date(2025, 3, 1),
                date(2025, 3, 3),
                30,
                None,
                bands(&[14]),
                segments(&[4]),
            )
            .unwrap()
        };
        let a: Vec<ObjectKey> = make().iter().collect();
        let resumed: Vec<ObjectKey> = make().iter().skip(50).collect();
        assert_eq!(&a[50..], &resumed[..]);
    }

    #[test]
    fn test_window_restricts_instants() {
        let window = TimeWindow {
            from: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            to: NaiveTime::from_hms_opt(10, 10, 0).unwrap(),
        };
        let space = KeySpace::new(
            date(2025, 3, 1),
            date(2025, 3, 1),
            10,
            Some(window),
            bands(&[14]),
            segments(&[4]),
        )
        .unwrap();
        let keys: Vec<String> = space.instants().map(|t| t.group_key()).collect();
        assert_eq!(keys, vec!["20250301_1000", "20250301_1010"]);
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn test_invalid_parameters() {
        let b = bands(&[14]);
        let s = segments(&[1]);
        assert!(KeySpace::new(date(2025, 3, 2), date(2025, 3, 1), 10, None, b.clone(), s.clone()).is_err());
        assert!(KeySpace::new(date(2025, 3, 1), date(2025, 3, 1), 0, None, b.clone(), s.clone()).is_err());
        assert!(KeySpace::new(date(2025, 3, 1), date(2025, 3, 1), 7, None, b, s).is_err());
    }

    #[test]
    fn test_empty_band_set_is_empty() {
        let space = KeySpace::new(
            date(2025, 3, 1),
            date(2025, 3, 1),
            10,
            None,
            Vec::new(),
            segments(&[1]),
        )
        .unwrap();
        assert!(space.is_empty());
        assert_eq!(space.iter().count(), 0);
    }
}
