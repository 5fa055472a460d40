//! `array→array` codecs.

#[cfg(feature = "transpose")]
pub mod transpose;
