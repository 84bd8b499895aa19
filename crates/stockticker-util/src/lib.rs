pub mod client_ext;
pub mod fs;
pub mod ui;

pub use crate::client_ext::json::{ClientJsonExt as Json, JsonResponse};
pub use crate::fs::{read_to_string_opt, write_atomic};
