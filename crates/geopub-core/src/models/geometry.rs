use serde::{Deserialize, Serialize};
use serde_json::Value;

fn collection_tag() -> String {
    "GeometryCollection".to_string()
}

/// The geometry of a publication, always a GeoJSON `GeometryCollection`
/// (possibly empty, never a bare geometry).
///
/// Member geometries stay schemaless JSON; the pipeline only needs to know
/// whether the collection is empty and what kind its first member is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryCollection {
    #[serde(rename = "type", default = "collection_tag")]
    kind: String,
    #[serde(default)]
    pub geometries: Vec<Value>,
}

impl Default for GeometryCollection {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeometryCollection {
    pub fn empty() -> Self {
        Self {
            kind: collection_tag(),
            geometries: Vec::new(),
        }
    }

    /// Wrap one bare GeoJSON geometry into a collection.
    pub fn from_geometry(geometry: Value) -> Self {
        Self {
            kind: collection_tag(),
            geometries: vec![geometry],
        }
    }

    /// Wrap the geometry of the first feature of a GeoJSON FeatureCollection.
    /// Returns `None` when the document has no usable feature geometry.
    pub fn from_feature_collection(doc: &Value) -> Option<Self> {
        let geometry = doc
            .get("features")?
            .as_array()?
            .first()?
            .get("geometry")?;
        if geometry.is_null() {
            return None;
        }
        Some(Self::from_geometry(geometry.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Human-readable kind of the first member, used in provenance notes.
    pub fn kind_summary(&self) -> &str {
        self.geometries
            .first()
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("empty")
    }
}
