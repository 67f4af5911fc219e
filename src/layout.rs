//! Page geometry for the watermark reference page

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Simple length type in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f32);

impl Length {
    /// Create a length from points
    pub fn from_pt(pt: f32) -> Self {
        Length(pt)
    }

    /// Create a length from millimeters
    pub fn from_mm(mm: f32) -> Self {
        Length(mm * 72.0 / 25.4)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f32) -> Self {
        Length(inches * 72.0)
    }

    /// Get the value in points
    pub fn pt(&self) -> f32 {
        self.0
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// Dimensions in points
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: Length::from_pt(width),
            height: Length::from_pt(height),
        }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// US Legal size (8.5" × 14")
    pub fn legal() -> Self {
        Self::new(612.0, 1008.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }

    /// Geometric center in points, origin at the bottom-left corner
    pub fn center(&self) -> (f32, f32) {
        (self.width.pt() / 2.0, self.height.pt() / 2.0)
    }

    /// `[0 0 w h]` as used for a MediaBox
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width.pt(), self.height.pt()]
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::letter()
    }
}

impl FromStr for PageDimensions {
    type Err = Error;

    /// Accepts `letter`, `legal`, `a4` or `<width>x<height>[unit]`, where the
    /// unit is `pt` (default), `in` or `mm`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "letter" => return Ok(Self::letter()),
            "legal" => return Ok(Self::legal()),
            "a4" => return Ok(Self::a4()),
            _ => {}
        }

        let invalid = || Error::invalid(format!(
            "invalid page size '{}': expected letter, legal, a4 or <width>x<height>[pt|in|mm]",
            s
        ));

        let lower = s.to_ascii_lowercase();
        let (dims, unit): (&str, fn(f32) -> Length) = if let Some(d) = lower.strip_suffix("in") {
            (d, Length::from_inches)
        } else if let Some(d) = lower.strip_suffix("mm") {
            (d, Length::from_mm)
        } else {
            (lower.strip_suffix("pt").unwrap_or(&lower), Length::from_pt)
        };

        let (w, h) = dims.split_once('x').ok_or_else(invalid)?;
        let width: f32 = w.trim().parse().map_err(|_| invalid())?;
        let height: f32 = h.trim().parse().map_err(|_| invalid())?;

        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(invalid());
        }

        Ok(Self {
            width: unit(width),
            height: unit(height),
        })
    }
}

impl fmt::Display for PageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}pt", self.width.pt(), self.height.pt())
    }
}
