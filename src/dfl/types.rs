//! DFL payload data structures

use std::collections::BTreeMap;
use std::fmt;

/// A decoded pickle value
///
/// Class references, constructor calls and `BUILD` states are kept as
/// inert data, so a dictionary written by DeepFaceLab can be copied into
/// another file without interpreting its numpy arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<MetaValue>),
    Tuple(Vec<MetaValue>),
    /// Key/value pairs in insertion order
    Dict(Vec<(MetaValue, MetaValue)>),
    Set(Vec<MetaValue>),
    FrozenSet(Vec<MetaValue>),
    /// A class or function reference, `module.name`
    Global { module: String, name: String },
    /// `callable(*args)`
    Reduce { callable: Box<MetaValue>, args: Box<MetaValue> },
    /// `class.__new__(class, *args)`
    NewObj { class: Box<MetaValue>, args: Box<MetaValue> },
    /// `object.__setstate__(state)`
    Build { object: Box<MetaValue>, state: Box<MetaValue> },
}

impl MetaValue {
    pub fn str(text: &str) -> Self {
        MetaValue::Str(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(value) => Some(*value),
            MetaValue::Bool(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// Numeric value of an int or float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(value) => Some(*value),
            MetaValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Items of a list or tuple
    pub fn as_sequence(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::List(items) | MetaValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a dict
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        match self {
            MetaValue::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether this is a reference to `module.name`
    pub fn is_global(&self, module: &str, name: &str) -> bool {
        matches!(self, MetaValue::Global { module: m, name: n } if m == module && n == name)
    }
}

/// The top-level DFL dictionary without the typed keys, ordered by key
pub type MetaMap = BTreeMap<String, MetaValue>;

/// A 2D point: a facial landmark or a polygon vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }
}

/// Whether a polygon adds to or cuts from the region of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonKind {
    Exclude,
    Include,
}

impl PolygonKind {
    /// Code stored in the `type` field of a DFL polygon
    pub fn code(&self) -> u8 {
        match self {
            PolygonKind::Exclude => 0,
            PolygonKind::Include => 1,
        }
    }

    /// Parses a polygon `type` code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PolygonKind::Exclude),
            1 => Some(PolygonKind::Include),
            _ => None,
        }
    }
}

/// A region-of-interest polygon
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPolygon {
    pub kind: PolygonKind,
    pub points: Vec<Point2>,
}

impl RegionPolygon {
    pub fn new(kind: PolygonKind, points: Vec<Point2>) -> Self {
        RegionPolygon { kind, points }
    }
}

/// Pixel shape of the host image, taken from its frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// The fields stored in a DFL payload
///
/// `dictionary` holds every key of the pickled dict except the three typed
/// ones. Every field is optional at this level; the container decides
/// whether the combination is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DflFields {
    pub dictionary: Option<MetaMap>,
    pub landmarks: Option<Vec<Point2>>,
    pub region_polygons: Option<Vec<RegionPolygon>>,
    pub mask: Option<Vec<u8>>,
}

impl DflFields {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.dictionary.is_none()
            && self.landmarks.is_none()
            && self.region_polygons.is_none()
            && self.mask.is_none()
    }
}
