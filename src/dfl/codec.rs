//! Mapping between the pickled DFL dictionary and `DflFields`
//!
//! DeepFaceLab stores face metadata as one pickled `dict`. The landmarks,
//! the XSeg polygons and the XSeg mask get typed fields; every other key is
//! carried through as an opaque value.
//!
//! Landmarks may be a list of `[x, y]` pairs or a numpy array of shape
//! `(n, 2)`. Polygons use the `{'polys': [{'type': k, 'pts': ...}]}` layout
//! of DeepFaceLab 2, or the older list of `(type, pts)` pairs. The mask is
//! the encoded image, either as bytes or as a `uint8` array.

use log::debug;
use std::collections::BTreeMap;

use crate::dfl::constants::keys;
use crate::dfl::ndarray::NdArray;
use crate::dfl::pickle;
use crate::dfl::types::{DflFields, MetaValue, Point2, PolygonKind, RegionPolygon};
use crate::errors::{WatermarkError, WatermarkResult};

/// Unpickles a payload and splits it into fields
pub fn decode_payload(payload: &[u8]) -> WatermarkResult<DflFields> {
    let MetaValue::Dict(entries) = pickle::loads(payload)? else {
        return Err(invalid("payload is not a dict"));
    };

    let mut fields = DflFields::default();
    let mut dictionary = BTreeMap::new();
    for (key, value) in entries {
        let MetaValue::Str(key) = key else {
            return Err(invalid("dictionary key is not a string"));
        };
        // DeepFaceLab drops None values before saving
        if value == MetaValue::Null && is_typed_key(&key) {
            continue;
        }
        match key.as_str() {
            keys::LANDMARKS => fields.landmarks = Some(decode_points(&value, keys::LANDMARKS)?),
            keys::SEG_IE_POLYS => fields.region_polygons = Some(decode_polygons(&value)?),
            keys::XSEG_MASK => fields.mask = Some(decode_mask(value)?),
            _ => {
                dictionary.insert(key, value);
            }
        }
    }
    fields.dictionary = Some(dictionary);

    debug!(
        "Decoded DFL dictionary: {} other keys, landmarks {}, polygons {}, mask {}",
        fields.dictionary.as_ref().map_or(0, |d| d.len()),
        fields.landmarks.is_some(),
        fields.region_polygons.is_some(),
        fields.mask.is_some()
    );
    Ok(fields)
}

/// Builds the dictionary from the fields and pickles it
pub fn encode_payload(fields: &DflFields) -> WatermarkResult<Vec<u8>> {
    let mut entries: Vec<(MetaValue, MetaValue)> = fields
        .dictionary
        .iter()
        .flat_map(|dictionary| dictionary.iter())
        .filter(|(key, _)| !is_typed_key(key))
        .map(|(key, value)| (MetaValue::str(key), value.clone()))
        .collect();

    if let Some(landmarks) = &fields.landmarks {
        entries.push((MetaValue::str(keys::LANDMARKS), points_value(landmarks)));
    }
    if let Some(polygons) = &fields.region_polygons {
        entries.push((MetaValue::str(keys::SEG_IE_POLYS), polygons_value(polygons)));
    }
    if let Some(mask) = &fields.mask {
        let array = NdArray::uint8(mask.clone(), vec![mask.len(), 1]);
        entries.push((MetaValue::str(keys::XSEG_MASK), array.to_value()));
    }

    pickle::dumps(&MetaValue::Dict(entries))
}

fn invalid(message: impl Into<String>) -> WatermarkError {
    WatermarkError::InvalidMetadata(message.into())
}

fn is_typed_key(key: &str) -> bool {
    matches!(key, keys::LANDMARKS | keys::SEG_IE_POLYS | keys::XSEG_MASK)
}

fn decode_points(value: &MetaValue, what: &str) -> WatermarkResult<Vec<Point2>> {
    if let Some(array) = NdArray::from_value(value) {
        if array.element_count() == 0 {
            return Ok(Vec::new());
        }
        if array.shape.len() != 2 || array.shape[1] != 2 {
            return Err(invalid(format!("{} array has shape {:?}", what, array.shape)));
        }
        let values = array
            .to_f64_vec()
            .ok_or_else(|| invalid(format!("{} array has unsupported dtype {}", what, array.dtype)))?;
        return Ok(values.chunks_exact(2).map(|xy| Point2::new(xy[0], xy[1])).collect());
    }

    let items = value
        .as_sequence()
        .ok_or_else(|| invalid(format!("{} is not a list of points", what)))?;
    items
        .iter()
        .map(|item| match item.as_sequence() {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Point2::new(x, y)),
                _ => Err(invalid(format!("{} has a non-numeric coordinate", what))),
            },
            _ => Err(invalid(format!("{} has an entry that is not an [x, y] pair", what))),
        })
        .collect()
}

fn decode_polygons(value: &MetaValue) -> WatermarkResult<Vec<RegionPolygon>> {
    let polys = match value {
        MetaValue::Dict(_) => value
            .get(keys::POLYS)
            .ok_or_else(|| invalid("seg_ie_polys has no polys list"))?,
        other => other,
    };
    let items = polys
        .as_sequence()
        .ok_or_else(|| invalid("seg_ie_polys is not a list"))?;

    items
        .iter()
        .map(|poly| {
            let (kind, points) = match poly {
                MetaValue::Dict(_) => (poly.get(keys::POLY_TYPE), poly.get(keys::POLY_POINTS)),
                _ => match poly.as_sequence() {
                    Some([kind, points]) => (Some(kind), Some(points)),
                    _ => (None, None),
                },
            };

            let kind = kind
                .and_then(MetaValue::as_i64)
                .and_then(|code| u8::try_from(code).ok())
                .and_then(PolygonKind::from_code)
                .ok_or_else(|| invalid("polygon has no valid type"))?;
            let points = points.ok_or_else(|| invalid("polygon has no points"))?;
            Ok(RegionPolygon::new(kind, decode_points(points, "polygon")?))
        })
        .collect()
}

fn decode_mask(value: MetaValue) -> WatermarkResult<Vec<u8>> {
    if let Some(array) = NdArray::from_value(&value) {
        if array.dtype != "u1" {
            return Err(invalid(format!("xseg_mask array has dtype {}", array.dtype)));
        }
        return Ok(array.data);
    }
    match value {
        MetaValue::Bytes(bytes) => Ok(bytes),
        _ => Err(invalid("xseg_mask is neither bytes nor a uint8 array")),
    }
}

/// Landmarks the way the extractor stores them: `[[x, y], ...]`
fn points_value(points: &[Point2]) -> MetaValue {
    MetaValue::List(
        points
            .iter()
            .map(|p| MetaValue::List(vec![MetaValue::Float(p.x), MetaValue::Float(p.y)]))
            .collect(),
    )
}

/// Polygons in the DeepFaceLab 2 layout, with `float32` point arrays
fn polygons_value(polygons: &[RegionPolygon]) -> MetaValue {
    let polys = polygons
        .iter()
        .map(|polygon| {
            let coords: Vec<f32> = polygon.points.iter().flat_map(|p| [p.x as f32, p.y as f32]).collect();
            let points = NdArray::float32(&coords, vec![polygon.points.len(), 2]);
            MetaValue::Dict(vec![
                (MetaValue::str(keys::POLY_TYPE), MetaValue::Int(polygon.kind.code() as i64)),
                (MetaValue::str(keys::POLY_POINTS), points.to_value()),
            ])
        })
        .collect();
    MetaValue::Dict(vec![(MetaValue::str(keys::POLYS), MetaValue::List(polys))])
}
