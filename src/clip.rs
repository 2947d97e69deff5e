//! Clipping gridded fields to a basin boundary.
//!
//! A cell is kept when its centre falls inside the basin. The clipped field
//! is cropped to the smallest index window holding every kept cell; cells
//! of that window outside the basin are set to `NaN`.

use std::{ops::Range, sync::Arc};

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    basin::{Basin, Crs},
    error::{Error, Result},
    granule::{Granule, GridSpec},
};

/// One time step restricted to a basin.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedField {
    pub date: NaiveDate,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub crs: Crs,
    /// Latitude-major values.
    pub values: Vec<f32>,
}

impl ClippedField {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied().filter(|v| !v.is_nan())
    }
}

/// Basin mask over a run's grid, computed once and applied to every step.
#[derive(Debug, Clone)]
pub struct ClipMask {
    grid: Arc<GridSpec>,
    crs: Crs,
    lon_range: Range<usize>,
    lat_range: Range<usize>,
    inside: Vec<bool>,
}

impl ClipMask {
    pub fn new(grid: &Arc<GridSpec>, crs: &Crs, basin: &Basin) -> Result<Self> {
        if basin.crs != *crs {
            return Err(Error::CrsMismatch {
                basin: basin.crs.to_string(),
                grid: crs.to_string(),
            });
        }

        let mut hits = Vec::new();

        if let Some(bbox) = basin.bbox() {
            let (min, max) = (bbox.min(), bbox.max());
            for (lat_idx, &lat) in grid.lat.iter().enumerate() {
                if lat < min.y || lat > max.y {
                    continue;
                }
                for (lon_idx, &lon) in grid.lon.iter().enumerate() {
                    if lon >= min.x && lon <= max.x && basin.contains(lon, lat) {
                        hits.push((lat_idx, lon_idx));
                    }
                }
            }
        }

        let (lat_range, lon_range) = match hits.first() {
            None => (0..0, 0..0),
            Some(_) => {
                let lat_min = hits.iter().map(|h| h.0).min().unwrap_or(0);
                let lat_max = hits.iter().map(|h| h.0).max().unwrap_or(0);
                let lon_min = hits.iter().map(|h| h.1).min().unwrap_or(0);
                let lon_max = hits.iter().map(|h| h.1).max().unwrap_or(0);
                (lat_min..lat_max + 1, lon_min..lon_max + 1)
            }
        };

        let width = lon_range.len();
        let mut inside = vec![false; lat_range.len() * width];
        for (lat_idx, lon_idx) in &hits {
            inside[(lat_idx - lat_range.start) * width + (lon_idx - lon_range.start)] = true;
        }

        debug!(
            cells = hits.len(),
            of = grid.cells(),
            "basin mask computed for `{}`",
            basin.name
        );

        Ok(ClipMask {
            grid: Arc::clone(grid),
            crs: crs.clone(),
            lon_range,
            lat_range,
            inside,
        })
    }

    /// Number of grid cells inside the basin.
    pub fn cells(&self) -> usize {
        self.inside.iter().filter(|&&i| i).count()
    }

    pub fn is_empty(&self) -> bool {
        self.inside.is_empty()
    }

    pub fn apply(&self, granule: &Granule) -> Result<ClippedField> {
        if !Arc::ptr_eq(&self.grid, &granule.grid) && *self.grid != *granule.grid {
            return Err(Error::GridMismatch(format!(
                "granule {} is not on the grid the mask was built for",
                granule.date
            )));
        }
        if granule.crs != self.crs {
            return Err(Error::CrsMismatch {
                basin: self.crs.to_string(),
                grid: granule.crs.to_string(),
            });
        }

        let width = self.lon_range.len();
        let mut values = Vec::with_capacity(self.inside.len());

        for (row, lat_idx) in self.lat_range.clone().enumerate() {
            for (col, lon_idx) in self.lon_range.clone().enumerate() {
                if self.inside[row * width + col] {
                    values.push(granule.value(lat_idx, lon_idx));
                } else {
                    values.push(f32::NAN);
                }
            }
        }

        Ok(ClippedField {
            date: granule.date,
            lon: self.grid.lon[self.lon_range.clone()].to_vec(),
            lat: self.grid.lat[self.lat_range.clone()].to_vec(),
            crs: self.crs.clone(),
            values,
        })
    }
}

/// Clips a single granule; prefer a shared [`ClipMask`] for a whole run.
pub fn clip(granule: &Granule, basin: &Basin) -> Result<ClippedField> {
    ClipMask::new(&granule.grid, &granule.crs, basin)?.apply(granule)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};

    fn granule_fixture() -> Granule {
        let grid = Arc::new(GridSpec {
            lon: vec![0.5, 1.5, 2.5, 3.5],
            lat: vec![0.5, 1.5, 2.5],
        });
        Granule {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            grid,
            crs: Crs::Wgs84,
            precipitation: (0..12).map(|v| v as f32).collect(),
        }
    }

    fn basin(ring: Vec<(f64, f64)>) -> Basin {
        let polygon = Polygon::new(LineString::from(ring), vec![]);
        Basin::new("test", Crs::Wgs84, MultiPolygon(vec![polygon])).unwrap()
    }

    #[test]
    fn should_return_original_grid_when_fully_covered() {
        let granule = granule_fixture();
        let basin = basin(vec![(-1.0, -1.0), (5.0, -1.0), (5.0, 4.0), (-1.0, 4.0)]);

        let clipped = clip(&granule, &basin).unwrap();

        assert_eq!(clipped.lon, granule.grid.lon);
        assert_eq!(clipped.lat, granule.grid.lat);
        assert_eq!(clipped.values, granule.precipitation);
        assert_eq!(clipped.crs, Crs::Wgs84);
    }

    #[test]
    fn should_return_empty_field_when_not_covered() {
        let granule = granule_fixture();
        let basin = basin(vec![(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 11.0)]);

        let clipped = clip(&granule, &basin).unwrap();

        assert!(clipped.is_empty());
        assert!(clipped.lon.is_empty());
        assert!(clipped.lat.is_empty());
    }

    #[test]
    fn should_crop_to_window_and_mask_outside_cells() {
        let granule = granule_fixture();
        // Triangle covering centres (0.5,0.5), (1.5,0.5), (0.5,1.5).
        let basin = basin(vec![(0.0, 0.0), (2.2, 0.0), (0.0, 2.2)]);

        let clipped = clip(&granule, &basin).unwrap();

        assert_eq!(clipped.lon, vec![0.5, 1.5]);
        assert_eq!(clipped.lat, vec![0.5, 1.5]);
        assert_eq!(clipped.values[0], 0.0);
        assert_eq!(clipped.values[1], 1.0);
        assert_eq!(clipped.values[2], 4.0);
        assert!(clipped.values[3].is_nan());
        assert_eq!(clipped.valid_values().count(), 3);
    }

    #[test]
    fn should_reject_crs_mismatch() {
        let granule = granule_fixture();
        let mut basin = basin(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        basin.crs = Crs::Other("EPSG:32612".to_string());

        assert!(matches!(
            clip(&granule, &basin),
            Err(Error::CrsMismatch { .. })
        ));
    }

    #[test]
    fn should_reject_granule_on_other_grid() {
        let granule = granule_fixture();
        let basin = basin(vec![(-1.0, -1.0), (5.0, -1.0), (5.0, 4.0), (-1.0, 4.0)]);
        let other = Arc::new(GridSpec {
            lon: vec![0.0],
            lat: vec![0.0],
        });
        let mask = ClipMask::new(&other, &Crs::Wgs84, &basin).unwrap();

        assert!(matches!(
            mask.apply(&granule),
            Err(Error::GridMismatch(_))
        ));
    }
}
