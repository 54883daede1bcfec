//! Descriptor types for the ArcGIS REST API.
//!
//! Service, geometry, field and result types are closed vocabularies. Parsing
//! a value outside the known set fails with [`Error::InvalidVariant`] instead
//! of passing the raw string through.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A raw JSON descriptor as returned by a resource endpoint.
pub type Descriptor = serde_json::Map<String, serde_json::Value>;

/// One flat attribute record (field name to raw value).
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Declares a string-backed enum with `FromStr`, `Display` and serde support.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $($variant:ident => $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = concat!("`", $value, "`")]
                $variant,
            )+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(Error::InvalidVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// Declared capability type of a service.
    ///
    /// Only [`ServiceType::FeatureServer`] exposes tables and layers through
    /// this client.
    pub enum ServiceType ("service type") {
        MapServer => "MapServer",
        FeatureServer => "FeatureServer",
        GeoDatabase => "GeoDatabase",
        Geocoding => "Geocoding",
        GeometryServer => "GeometryServer",
        ImageServer => "ImageServer",
        TileServer => "TileServer",
        Geoprocessing => "Geoprocessing",
        GeodataAccess => "GeodataAccess",
        GeocodeServer => "GeocodeServer",
        GeometryAnalytics => "GeometryAnalytics",
        GeometryService => "GeometryService",
        GeometryTools => "GeometryTools",
        GeometryToolsAdmin => "GeometryToolsAdmin",
        GeometryToolsAnalytics => "GeometryToolsAnalytics",
        GeometryToolsGeocoding => "GeometryToolsGeocoding",
        GeometryToolsGeodataAccess => "GeometryToolsGeodataAccess",
        GeometryToolsGeometryAnalytics => "GeometryToolsGeometryAnalytics",
        GeometryToolsGeometryService => "GeometryToolsGeometryService",
        GeometryToolsGeometryTools => "GeometryToolsGeometryTools",
        GeometryToolsGeometryToolsAdmin => "GeometryToolsGeometryToolsAdmin",
    }
}

impl ServiceType {
    /// Whether the client can discover tables and layers for this type.
    pub fn is_supported(&self) -> bool {
        matches!(self, ServiceType::FeatureServer)
    }
}

string_enum! {
    /// Geometry type of a layer.
    pub enum GeometryType ("geometry type") {
        Point => "esriGeometryPoint",
        Multipoint => "esriGeometryMultipoint",
        Polyline => "esriGeometryPolyline",
        Polygon => "esriGeometryPolygon",
        Raster => "esriGeometryRaster",
        Unknown => "esriGeometryUnknown",
        Envelope => "esriGeometryEnvelope",
        Extent => "esriGeometryExtent",
        CircularArc => "esriGeometryCircularArc",
        CircularArcZ => "esriGeometryCircularArcZ",
        CircularArcM => "esriGeometryCircularArcM",
        CircularArcZM => "esriGeometryCircularArcZM",
        Triangle => "esriGeometryTriangle",
        TriangleZ => "esriGeometryTriangleZ",
        TriangleM => "esriGeometryTriangleM",
        TriangleZM => "esriGeometryTriangleZM",
        PolygonZ => "esriGeometryPolygonZ",
        PolygonM => "esriGeometryPolygonM",
        PolygonZM => "esriGeometryPolygonZM",
        ExtentZ => "esriGeometryExtentZ",
        ExtentM => "esriGeometryExtentM",
        ExtentZM => "esriGeometryExtentZM",
    }
}

string_enum! {
    /// Declared value type of a field.
    pub enum FieldType ("field type") {
        String => "esriFieldTypeString",
        SmallInteger => "esriFieldTypeSmallInteger",
        Integer => "esriFieldTypeInteger",
        Double => "esriFieldTypeDouble",
        Single => "esriFieldTypeSingle",
        Date => "esriFieldTypeDate",
        Blob => "esriFieldTypeBlob",
        Raster => "esriFieldTypeRaster",
        Guid => "esriFieldTypeGUID",
        GlobalId => "esriFieldTypeGlobalID",
        Xml => "esriFieldTypeXML",
        Geometry => "esriFieldTypeGeometry",
        RasterDataset => "esriFieldTypeRasterDataset",
        BlobDataset => "esriFieldTypeBlobDataset",
        Dataset => "esriFieldTypeDataset",
        DatasetName => "esriFieldTypeDatasetName",
        GeometryDataset => "esriFieldTypeGeometryDataset",
        ObjectId => "esriFieldTypeOID",
        SmallDate => "esriFieldTypeSmallDate",
        SmallDateTime => "esriFieldTypeSmallDateTime",
        SmallTime => "esriFieldTypeSmallTime",
        StringDate => "esriFieldTypeStringDate",
        StringDateTime => "esriFieldTypeStringDateTime",
        StringTime => "esriFieldTypeStringTime",
        StringDateTimeTz => "esriFieldTypeStringDateTimeTZ",
        StringDateTimeUtc => "esriFieldTypeStringDateTimeUTC",
    }
}

string_enum! {
    /// Value of the `resultType` query parameter.
    pub enum ResultType ("result type") {
        None => "none",
        Standard => "standard",
        Tile => "tile",
    }
}

impl Default for ResultType {
    fn default() -> Self {
        ResultType::Standard
    }
}

/// Field/column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Display alias, the name when the server declares none
    pub alias: String,
    /// Declared value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    /// Create a field; an empty or missing alias falls back to the name.
    pub fn new(name: impl Into<String>, field_type: FieldType, alias: Option<String>) -> Self {
        let name = name.into();
        let alias = alias
            .filter(|alias| !alias.is_empty())
            .unwrap_or_else(|| name.clone());
        Self {
            name,
            alias,
            field_type,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Field {
    pub(crate) fn from_entry(entry: FieldEntry) -> Result<Self> {
        Ok(Field::new(entry.name, entry.field_type.parse()?, entry.alias))
    }
}

// Entry shapes inside descriptors. Type names stay raw strings here so the
// vocabulary check yields `Error::InvalidVariant` rather than a serde error.

/// Entry of a `fields` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Entry of a catalog's `services` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServiceEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Entry of a service's `layers` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LayerEntry {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "geometryType")]
    pub geometry_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl LayerEntry {
    /// Geometry type, preferring `geometryType` over the legacy `type` key.
    ///
    /// Current servers put the layer kind (`Feature Layer`, `Group Layer`)
    /// under `type`; only `esriGeometry*` values there are read as geometry.
    pub fn geometry(&self) -> Result<Option<GeometryType>> {
        let legacy = self
            .kind
            .as_deref()
            .filter(|kind| kind.starts_with("esriGeometry"));

        self.geometry_type
            .as_deref()
            .or(legacy)
            .map(str::parse)
            .transpose()
    }
}

/// Entry of a service's `tables` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TableEntry {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}
