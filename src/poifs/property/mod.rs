//! Directory entries and the directory tree.

mod order;
mod record;
mod table;

pub use order::{compare_names, names_match};
pub use record::{
    datetime_to_filetime, empty_record, filetime_to_datetime, uses_small_blocks, validate_name,
    Property, PropertyType,
};
pub use table::PropertyTable;
