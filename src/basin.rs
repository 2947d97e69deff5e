//! Basin boundary geometry.
//!
//! A basin is read once per run from a Shapefile, GeoJSON or WKT file and is
//! then used to mask every granule. Coordinates are `(lon, lat)` in the
//! basin's CRS.

use std::{fmt, fs, path::Path};

use geo::{BoundingRect, Contains, Coord, Geometry, LineString, MultiPolygon, Point, Polygon, Rect};
use geojson::GeoJson;
use serde_json::Value;
use shapefile::PolygonRing;
use tracing::warn;
use wkt::TryFromWkt;

use crate::error::{Error, Result};

/// Coordinate reference system attached to a grid or a geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Geographic WGS84, EPSG:4326.
    Wgs84,
    Other(String),
}

impl Crs {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "EPSG:4326"
            | "WGS84"
            | "CRS84"
            | "URN:OGC:DEF:CRS:EPSG::4326"
            | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" => Crs::Wgs84,
            _ => Crs::Other(name.trim().to_string()),
        }
    }

    /// Reads the ESRI WKT of a Shapefile `.prj`.
    ///
    /// Only a geographic WGS84 definition maps to [`Crs::Wgs84`]; anything
    /// else keeps the name of its outermost node.
    pub fn from_prj(text: &str) -> Self {
        let text = text.trim();
        let upper = text.to_uppercase();
        let wgs84 = ["WGS_1984", "WGS 84", "WGS84"].iter().any(|n| upper.contains(n));

        if upper.starts_with("GEOGCS") && wgs84 {
            return Crs::Wgs84;
        }

        let name = text.split('"').nth(1).unwrap_or(text);
        Crs::Other(name.to_string())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Wgs84 => write!(f, "EPSG:4326"),
            Crs::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A (multi-)polygon watershed boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Basin {
    pub name: String,
    pub crs: Crs,
    pub geometry: MultiPolygon<f64>,
}

impl Basin {
    pub fn new(name: impl Into<String>, crs: Crs, geometry: MultiPolygon<f64>) -> Result<Self> {
        if geometry.0.is_empty() {
            return Err(Error::InvalidGeometry(
                "no polygon found in basin geometry".to_string(),
            ));
        }

        Ok(Basin {
            name: name.into(),
            crs,
            geometry,
        })
    }

    /// Reads a basin from a `.shp`, `.geojson`/`.json` or `.wkt` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let mut basin = match extension.as_str() {
            "shp" => Basin::from_shapefile(path)?,
            "geojson" | "json" => Basin::from_geojson(&fs::read_to_string(path)?)?,
            "wkt" => Basin::from_wkt(&fs::read_to_string(path)?)?,
            other => {
                return Err(Error::InvalidGeometry(format!(
                    "unsupported basin file format `.{}` for {}",
                    other,
                    path.display()
                )))
            }
        };
        basin.name = name;

        Ok(basin)
    }

    /// Reads every polygon of a Shapefile; the CRS comes from the sibling
    /// `.prj`, or WGS84 when there is none.
    pub fn from_shapefile(path: &Path) -> Result<Self> {
        let shapes = shapefile::read_shapes_as::<_, shapefile::Polygon>(path)
            .map_err(|e| Error::InvalidGeometry(format!("{}: {}", path.display(), e)))?;

        let polygons = shapes.iter().flat_map(polygons_from_shape).collect();

        let crs = match fs::read_to_string(path.with_extension("prj")) {
            Ok(text) => Crs::from_prj(&text),
            Err(_) => {
                warn!("{} has no .prj, assuming EPSG:4326", path.display());
                Crs::Wgs84
            }
        };

        Basin::new(String::new(), crs, MultiPolygon(polygons))
    }

    pub fn from_geojson(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        // RFC 7946 GeoJSON is always WGS84; older files may carry a named CRS.
        let crs = value
            .pointer("/crs/properties/name")
            .and_then(Value::as_str)
            .map(Crs::from_name)
            .unwrap_or(Crs::Wgs84);

        let geojson = GeoJson::from_json_value(value)
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;
        let collection = geojson::quick_collection::<f64>(&geojson)
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;

        let mut polygons = Vec::new();
        for geometry in collection {
            collect_polygons(geometry, &mut polygons)?;
        }

        Basin::new(String::new(), crs, MultiPolygon(polygons))
    }

    /// WKT carries no CRS, so WGS84 is assumed.
    pub fn from_wkt(text: &str) -> Result<Self> {
        let geometry = Geometry::<f64>::try_from_wkt_str(text.trim())
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;

        let mut polygons = Vec::new();
        collect_polygons(geometry, &mut polygons)?;

        Basin::new(String::new(), Crs::Wgs84, MultiPolygon(polygons))
    }

    /// Inside any member polygon and outside its holes.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }

    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match geometry {
        Geometry::Polygon(polygon) => out.push(polygon),
        Geometry::MultiPolygon(polygons) => out.extend(polygons),
        Geometry::Rect(rect) => out.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => out.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for geometry in collection {
                collect_polygons(geometry, out)?;
            }
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) => return Err(non_polygonal("points")),
        _ => return Err(non_polygonal("lines")),
    }

    Ok(())
}

fn non_polygonal(kind: &str) -> Error {
    Error::InvalidGeometry(format!("basin geometry must be polygonal, found {}", kind))
}

// Outer rings start a polygon; inner rings are holes of the preceding one.
fn polygons_from_shape(shape: &shapefile::Polygon) -> Vec<Polygon<f64>> {
    let mut rings: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in shape.rings() {
        let line: LineString<f64> = ring
            .points()
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();

        match ring {
            PolygonRing::Outer(_) => rings.push((line, Vec::new())),
            PolygonRing::Inner(_) => match rings.last_mut() {
                Some((_, holes)) => holes.push(line),
                None => rings.push((line, Vec::new())),
            },
        }
    }

    rings
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::ShapeWriter;
    use tempfile::TempDir;

    const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const UTM_PRJ: &str = r#"PROJCS["NAD83 / UTM zone 12N",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],UNIT["metre",1]]"#;

    fn write_shapefile(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let square = |w: f64, s: f64, e: f64, n: f64| {
            vec![
                shapefile::Point::new(w, s),
                shapefile::Point::new(w, n),
                shapefile::Point::new(e, n),
                shapefile::Point::new(e, s),
                shapefile::Point::new(w, s),
            ]
        };
        let polygon = shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(square(0.0, 0.0, 10.0, 10.0)),
            PolygonRing::Inner(square(4.0, 4.0, 6.0, 6.0).into_iter().rev().collect()),
        ]);

        let writer = ShapeWriter::from_path(&path).unwrap();
        writer.write_shapes(&[polygon]).unwrap();

        path
    }

    #[test]
    fn should_read_shapefile_with_prj() {
        let dir = TempDir::new().unwrap();
        let path = write_shapefile(dir.path(), "YellowstoneRiver_drainage_WGS84.shp");
        fs::write(path.with_extension("prj"), WGS84_PRJ).unwrap();

        let basin = Basin::from_file(&path).unwrap();

        assert_eq!(basin.name, "YellowstoneRiver_drainage_WGS84");
        assert_eq!(basin.crs, Crs::Wgs84);
        assert_eq!(basin.geometry.0.len(), 1);
        assert_eq!(basin.geometry.0[0].interiors().len(), 1);
        assert!(basin.contains(1.0, 1.0));
        assert!(!basin.contains(5.0, 5.0));
        assert!(!basin.contains(11.0, 1.0));
    }

    #[test]
    fn should_take_projected_crs_from_prj() {
        let dir = TempDir::new().unwrap();
        let path = write_shapefile(dir.path(), "basin_utm.shp");
        fs::write(path.with_extension("prj"), UTM_PRJ).unwrap();

        let basin = Basin::from_file(&path).unwrap();

        assert_eq!(basin.crs, Crs::Other("NAD83 / UTM zone 12N".to_string()));
    }

    #[test]
    fn should_assume_wgs84_without_prj() {
        let dir = TempDir::new().unwrap();
        let path = write_shapefile(dir.path(), "basin.shp");

        assert_eq!(Basin::from_shapefile(&path).unwrap().crs, Crs::Wgs84);
    }

    #[test]
    fn should_parse_geojson_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "YellowstoneRiver"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[-111.0, 44.0], [-109.0, 44.0], [-109.0, 46.0], [-111.0, 44.0]]],
                            [[[-108.0, 45.0], [-107.0, 45.0], [-107.0, 46.0], [-108.0, 45.0]]]
                        ]
                    }
                }
            ]
        }"#;

        let basin = Basin::from_geojson(text).unwrap();

        assert_eq!(basin.crs, Crs::Wgs84);
        assert_eq!(basin.geometry.0.len(), 2);

        let bbox = basin.bbox().unwrap();
        assert_eq!(bbox.min(), Coord { x: -111.0, y: 44.0 });
        assert_eq!(bbox.max(), Coord { x: -107.0, y: 46.0 });
    }

    #[test]
    fn should_read_legacy_geojson_crs() {
        let text = r#"{
            "type": "Feature",
            "crs": {"type": "name", "properties": {"name": "EPSG:32612"}},
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]]
            }
        }"#;

        let basin = Basin::from_geojson(text).unwrap();

        assert_eq!(basin.crs, Crs::Other("EPSG:32612".to_string()));
    }

    #[test]
    fn should_reject_non_polygonal_geometry() {
        let text = r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#;

        assert!(matches!(
            Basin::from_geojson(text),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn should_parse_wkt_polygon_with_hole() {
        let basin =
            Basin::from_wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4))")
                .unwrap();

        assert_eq!(basin.geometry.0.len(), 1);
        assert!(basin.contains(1.0, 1.0));
        assert!(!basin.contains(5.0, 5.0));
    }

    #[test]
    fn should_parse_wkt_multipolygon() {
        let basin = Basin::from_wkt(
            "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 1, 0 0)), ((5 5, 6 5, 6 6, 5 6, 5 5)))",
        )
        .unwrap();

        assert_eq!(basin.geometry.0.len(), 2);
        assert!(basin.contains(0.5, 0.5));
        assert!(basin.contains(5.5, 5.5));
        assert!(!basin.contains(3.0, 3.0));
    }

    #[test]
    fn should_reject_malformed_wkt() {
        assert!(Basin::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 0)").is_err());
        assert!(Basin::from_wkt("POINT(1 1)").is_err());
    }

    #[test]
    fn should_reject_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("basin.kml");
        fs::write(&path, "<kml/>").unwrap();

        assert!(matches!(
            Basin::from_file(&path),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn should_map_crs_names() {
        assert_eq!(Crs::from_name("epsg:4326"), Crs::Wgs84);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Crs::Wgs84);
        assert_eq!(Crs::from_prj(WGS84_PRJ), Crs::Wgs84);
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
    }
}
