//! AHI spectral band and full-disk segment identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Highest AHI band number.
pub const MAX_BAND: u8 = 16;

/// An AHI spectral band, written `B01`..`B16` in filenames and output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "NumberOrText", into = "String")]
pub struct Band(u8);

impl Band {
    pub fn new(number: u8) -> CommonResult<Self> {
        if (1..=MAX_BAND).contains(&number) {
            Ok(Self(number))
        } else {
            Err(CommonError::InvalidBand(format!(
                "band number {} outside 1..={}",
                number, MAX_BAND
            )))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Infrared bands (7..=16) are calibrated to brightness temperature in Kelvin.
    pub fn is_infrared(&self) -> bool {
        self.0 >= 7
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{:02}", self.0)
    }
}

impl FromStr for Band {
    type Err = CommonError;

    /// Accepts `B14`, `b14` or a bare `14`.
    fn from_str(s: &str) -> CommonResult<Self> {
        let digits = s.trim().trim_start_matches(['B', 'b']);
        let number = digits
            .parse::<u8>()
            .map_err(|_| CommonError::InvalidBand(s.to_string()))?;
        Self::new(number)
    }
}

impl From<Band> for String {
    fn from(band: Band) -> Self {
        band.to_string()
    }
}

impl TryFrom<NumberOrText> for Band {
    type Error = CommonError;

    fn try_from(value: NumberOrText) -> CommonResult<Self> {
        match value {
            NumberOrText::Number(n) => Band::new(n),
            NumberOrText::Text(s) => s.parse(),
        }
    }
}

/// One horizontal stripe of a full-disk image, numbered from the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "NumberOrText", into = "u8")]
pub struct Segment(u8);

impl Segment {
    pub fn new(number: u8) -> CommonResult<Self> {
        if (1..=99).contains(&number) {
            Ok(Self(number))
        } else {
            Err(CommonError::InvalidSegment(format!(
                "segment number {} outside 1..=99",
                number
            )))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// All segments `1..=total`.
    pub fn all(total: u8) -> Vec<Segment> {
        (1..=total).map(Segment).collect()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}", self.0)
    }
}

impl FromStr for Segment {
    type Err = CommonError;

    /// Accepts `S04`, `04` or `4`.
    fn from_str(s: &str) -> CommonResult<Self> {
        let digits = s.trim().trim_start_matches(['S', 's']);
        let number = digits
            .parse::<u8>()
            .map_err(|_| CommonError::InvalidSegment(s.to_string()))?;
        Self::new(number)
    }
}

impl From<Segment> for u8 {
    fn from(segment: Segment) -> Self {
        segment.0
    }
}

impl TryFrom<NumberOrText> for Segment {
    type Error = CommonError;

    fn try_from(value: NumberOrText) -> CommonResult<Self> {
        match value {
            NumberOrText::Number(n) => Segment::new(n),
            NumberOrText::Text(s) => s.parse(),
        }
    }
}

/// Config files may list bands and segments either as numbers or as labels.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u8),
    Text(String),
}
