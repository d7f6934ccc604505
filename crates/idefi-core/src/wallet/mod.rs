//! Wallet validation and address-list parsing

mod address;
mod csv;
mod eoa;

pub use address::{validate_address_shape, ADDRESS_LEN};
pub use csv::{is_csv_filename, parse_address_csv, sanitize_filename};
pub use eoa::{EoaValidator, EMPTY_CODE};
