//! Inventory document formats and content-based dispatch.

use serde::Deserialize;
use serde_json::Value;

use crate::model::{CanonicalTile, SampleExtent};

// ============================================================================
// Wire structs
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireExtents {
    #[serde(rename = "minimumX")]
    minimum_x: f64,
    #[serde(rename = "maximumX")]
    maximum_x: f64,
    #[serde(rename = "minimumY")]
    minimum_y: f64,
    #[serde(rename = "maximumY")]
    maximum_y: f64,
    #[serde(rename = "minimumZ")]
    minimum_z: f64,
    #[serde(rename = "maximumZ")]
    maximum_z: f64,
}

impl From<WireExtents> for SampleExtent {
    fn from(w: WireExtents) -> Self {
        SampleExtent {
            min_x: w.minimum_x,
            max_x: w.maximum_x,
            min_y: w.minimum_y,
            max_y: w.maximum_y,
            min_z: w.minimum_z,
            max_z: w.maximum_z,
        }
    }
}

/// Lattice triple; any axis may be absent.
#[derive(Debug, Default, Deserialize)]
struct WireTriple {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
}

impl WireTriple {
    fn split(this: Option<Self>) -> (Option<f64>, Option<f64>, Option<f64>) {
        match this {
            Some(t) => (t.x, t.y, t.z),
            None => (None, None, None),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipelineTile {
    id: Option<i64>,
    relative_path: String,
    position: Option<WireTriple>,
    step: Option<WireTriple>,
    #[serde(default)]
    is_complete: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipelineDocument {
    // Presence of this field is what selected the format; the value itself
    // is a format revision marker the core does not interpret.
    #[serde(rename = "pipelineFormat")]
    _pipeline_format: Value,
    extents: Option<WireExtents>,
    #[serde(default)]
    tiles: Vec<PipelineTile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardContents {
    lattice_position: Option<WireTriple>,
    lattice_step: Option<WireTriple>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardTile {
    id: Option<i64>,
    relative_path: String,
    contents: Option<DashboardContents>,
    #[serde(default)]
    is_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DashboardMonitor {
    extents: Option<WireExtents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardDocument {
    #[serde(default)]
    monitor: DashboardMonitor,
    #[serde(default)]
    tile_map: serde_json::Map<String, Value>,
}

// ============================================================================
// Parsed document
// ============================================================================

/// One named group of tiles from a dashboard document's `tileMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGroup {
    pub name: String,
    pub tiles: Vec<CanonicalTile>,
}

/// A parsed inventory document, tagged by source format.
///
/// Both variants yield the same canonical tile vector; the tag is retained so
/// callers can log which format fed a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryDocument {
    Pipeline {
        extents: Option<SampleExtent>,
        tiles: Vec<CanonicalTile>,
    },
    Dashboard {
        extents: Option<SampleExtent>,
        groups: Vec<TileGroup>,
    },
}

impl InventoryDocument {
    /// Parses document text, dispatching on the presence of `pipelineFormat`.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("pipelineFormat").is_some() {
            let doc: PipelineDocument = serde_json::from_value(value)?;
            Ok(Self::from_pipeline(doc))
        } else {
            let doc: DashboardDocument = serde_json::from_value(value)?;
            Self::from_dashboard(doc)
        }
    }

    fn from_pipeline(doc: PipelineDocument) -> Self {
        let tiles = doc
            .tiles
            .into_iter()
            .map(|t| {
                CanonicalTile::from_inventory(
                    &t.relative_path,
                    t.id,
                    WireTriple::split(t.position),
                    WireTriple::split(t.step),
                    t.is_complete,
                )
            })
            .collect();
        InventoryDocument::Pipeline {
            extents: doc.extents.map(SampleExtent::from),
            tiles,
        }
    }

    fn from_dashboard(doc: DashboardDocument) -> Result<Self, serde_json::Error> {
        let mut groups = Vec::with_capacity(doc.tile_map.len());
        for (name, value) in doc.tile_map {
            let wire_tiles: Vec<DashboardTile> = serde_json::from_value(value)?;
            let tiles = wire_tiles
                .into_iter()
                .map(|t| {
                    let (position, step) = match t.contents {
                        Some(c) => (
                            WireTriple::split(c.lattice_position),
                            WireTriple::split(c.lattice_step),
                        ),
                        None => ((None, None, None), (None, None, None)),
                    };
                    CanonicalTile::from_inventory(&t.relative_path, t.id, position, step, t.is_complete)
                })
                .collect();
            groups.push(TileGroup { name, tiles });
        }
        Ok(InventoryDocument::Dashboard {
            extents: doc.monitor.extents.map(SampleExtent::from),
            groups,
        })
    }

    /// Sample extent declared by the document, if any.
    pub fn extents(&self) -> Option<SampleExtent> {
        match self {
            InventoryDocument::Pipeline { extents, .. } => *extents,
            InventoryDocument::Dashboard { extents, .. } => *extents,
        }
    }

    /// The canonical tile vector in document order.
    ///
    /// Dashboard groups are concatenated in the order they appear in the
    /// document. Duplicate relative paths are NOT collapsed here; the muxer
    /// deduplicates by key.
    pub fn into_tiles(self) -> Vec<CanonicalTile> {
        match self {
            InventoryDocument::Pipeline { tiles, .. } => tiles,
            InventoryDocument::Dashboard { groups, .. } => {
                groups.into_iter().flat_map(|g| g.tiles).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StageStatus;

    #[test]
    fn pipeline_document_parses_tiles_in_order() {
        let text = r#"{
            "pipelineFormat": 2,
            "extents": {
                "minimumX": 0.0, "maximumX": 400.5,
                "minimumY": -10.0, "maximumY": 90.0,
                "minimumZ": 1.0, "maximumZ": 33.0
            },
            "tiles": [
                {"id": 1, "relativePath": "a\\b.tif",
                 "position": {"x": 0, "y": 1, "z": 2}, "isComplete": false},
                {"id": 2, "relativePath": "c/d.tif", "isComplete": true}
            ]
        }"#;

        let doc = InventoryDocument::parse(text).unwrap();
        let extents = doc.extents().unwrap();
        assert_eq!(extents.max_x, 400.5);
        assert_eq!(extents.min_y, -10.0);

        let tiles = doc.into_tiles();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].relative_path, "a/b.tif");
        assert_eq!(tiles[0].lat_z, Some(2.0));
        assert_eq!(tiles[0].this_stage_status, StageStatus::Incomplete);
        assert_eq!(tiles[1].relative_path, "c/d.tif");
        assert_eq!(tiles[1].index, Some(2));
        // Missing position/step objects default to all-absent axes.
        assert_eq!(tiles[1].lat_x, None);
        assert_eq!(tiles[1].step_x, None);
        assert_eq!(tiles[1].this_stage_status, StageStatus::Complete);
    }

    #[test]
    fn dashboard_document_concatenates_groups() {
        let text = r#"{
            "monitor": {
                "extents": {
                    "minimumX": 1, "maximumX": 2,
                    "minimumY": 3, "maximumY": 4,
                    "minimumZ": 5, "maximumZ": 6
                }
            },
            "tileMap": {
                "row-0": [
                    {"id": 10, "relativePath": "r0/t0.tif",
                     "contents": {"latticePosition": {"x": 0, "y": 0, "z": 0},
                                  "latticeStep": {"x": 1, "y": 1, "z": 1}},
                     "isComplete": true}
                ],
                "row-1": [
                    {"id": 11, "relativePath": "r1\\t1.tif",
                     "contents": {"latticePosition": {"x": 0, "y": 1, "z": 0},
                                  "latticeStep": {"x": 1, "y": 1, "z": 1}},
                     "isComplete": false}
                ]
            }
        }"#;

        let doc = InventoryDocument::parse(text).unwrap();
        assert_eq!(doc.extents().unwrap().min_z, 5.0);

        match &doc {
            InventoryDocument::Dashboard { groups, .. } => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].name, "row-0");
            }
            other => panic!("expected dashboard document, got {:?}", other),
        }

        let tiles = doc.into_tiles();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].relative_path, "r0/t0.tif");
        assert_eq!(tiles[1].relative_path, "r1/t1.tif");
        assert_eq!(tiles[1].lat_y, Some(1.0));
        assert_eq!(tiles[1].step_y, Some(1.0));
    }

    #[test]
    fn dispatch_is_by_content_not_filename() {
        // No pipelineFormat field anywhere, so this parses as dashboard even
        // though a caller may have read it from pipeline-input.json.
        let doc = InventoryDocument::parse(r#"{"tileMap": {}}"#).unwrap();
        assert!(matches!(doc, InventoryDocument::Dashboard { .. }));
        assert_eq!(doc.into_tiles().len(), 0);

        let doc = InventoryDocument::parse(r#"{"pipelineFormat": "1", "tiles": []}"#).unwrap();
        assert!(matches!(doc, InventoryDocument::Pipeline { .. }));
    }

    #[test]
    fn malformed_documents_error() {
        assert!(InventoryDocument::parse("nope").is_err());
        // Pipeline tile missing its required relativePath.
        let text = r#"{"pipelineFormat": 1, "tiles": [{"id": 3}]}"#;
        assert!(InventoryDocument::parse(text).is_err());
    }

    #[test]
    fn extents_are_optional_in_both_formats() {
        let doc = InventoryDocument::parse(r#"{"pipelineFormat": 1, "tiles": []}"#).unwrap();
        assert!(doc.extents().is_none());

        let doc = InventoryDocument::parse(r#"{"tileMap": {}}"#).unwrap();
        assert!(doc.extents().is_none());
    }
}
