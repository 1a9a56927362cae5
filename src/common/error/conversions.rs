//! Error conversion implementations.
//!
//! From trait implementations that lift low-level parsing errors into the
//! unified [`PoifsError`].

use super::types::PoifsError;
use crate::common::binary::BinaryError;

impl From<BinaryError> for PoifsError {
    fn from(err: BinaryError) -> Self {
        PoifsError::RecordFormat(err.to_string())
    }
}
