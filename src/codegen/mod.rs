pub mod fmt;

pub use fmt::{FmtMode, format, format_with};
