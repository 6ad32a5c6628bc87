pub mod pdf;
pub mod print;

pub use pdf::{download_name, page_document, PdfGenerator};
pub use print::print_view;
