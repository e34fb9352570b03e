pub mod csv;
pub mod export;

pub use self::csv::{detect_format, parse_file, parse_row, CsvError, ParsedFile, RowFormat};
pub use self::export::export_csv;
