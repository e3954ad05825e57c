//! Tests for the DFL container

mod framing_tests;
mod pickle_tests;
