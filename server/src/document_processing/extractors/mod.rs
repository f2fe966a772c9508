// Extractors for the supported document formats

pub mod pdf;
pub mod txt;

pub use pdf::PdfExtractor;
pub use txt::TxtExtractor;
