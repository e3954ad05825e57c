//! Tests for the JPEG segment layer

pub(crate) mod test_utils;
mod reader_tests;
