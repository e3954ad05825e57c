//! DFL container constants

/// Keys of the DeepFaceLab metadata dictionary that have typed accessors
pub mod keys {
    /// Facial landmarks, a list of `[x, y]` pairs
    pub const LANDMARKS: &str = "landmarks";
    /// Segmentation include/exclude polygons
    pub const SEG_IE_POLYS: &str = "seg_ie_polys";
    /// Compressed XSeg mask image
    pub const XSEG_MASK: &str = "xseg_mask";
    /// Polygon list inside `seg_ie_polys`
    pub const POLYS: &str = "polys";
    /// Polygon kind inside a polygon entry
    pub const POLY_TYPE: &str = "type";
    /// Polygon vertices inside a polygon entry
    pub const POLY_POINTS: &str = "pts";
}

/// Pickle opcodes
pub mod opcodes {
    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const REDUCE: u8 = b'R';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const BUILD: u8 = b'b';
    pub const GLOBAL: u8 = b'c';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const SETITEM: u8 = b's';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const SETITEMS: u8 = b'u';
    pub const BINFLOAT: u8 = b'G';

    // Protocol 2
    pub const PROTO: u8 = 0x80;
    pub const NEWOBJ: u8 = 0x81;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;

    // Protocol 3
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';

    // Protocol 4
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const EMPTY_SET: u8 = 0x8f;
    pub const ADDITEMS: u8 = 0x90;
    pub const FROZENSET: u8 = 0x91;
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;

    // Protocol 5
    pub const BYTEARRAY8: u8 = 0x96;
}

/// Globals that numpy uses to pickle arrays
pub mod numpy {
    /// Modules providing `_reconstruct` (numpy 1.x and 2.x)
    pub const MULTIARRAY_MODULES: [&str; 2] = ["numpy.core.multiarray", "numpy._core.multiarray"];
    pub const RECONSTRUCT: &str = "_reconstruct";
    pub const MODULE: &str = "numpy";
    pub const NDARRAY: &str = "ndarray";
    pub const DTYPE: &str = "dtype";
    /// Version field of the array state tuple
    pub const ARRAY_STATE_VERSION: i64 = 1;
    /// Version field of the dtype state tuple
    pub const DTYPE_STATE_VERSION: i64 = 3;
}

/// Bounds on decoded and encoded pickles
pub mod limits {
    /// Highest pickle protocol understood
    pub const MAX_PROTOCOL: u8 = 5;
    /// Protocol written by the encoder
    pub const WRITE_PROTOCOL: u8 = 4;
    /// Deepest container nesting accepted
    pub const MAX_DEPTH: usize = 64;
    /// Items per MARK batch when writing lists, dicts and sets
    pub const BATCH_SIZE: usize = 1000;
    /// Bytes that memo lookups may copy while decoding one pickle
    pub const MAX_MEMO_COPY_BYTES: usize = 16 * 1024 * 1024;
}
