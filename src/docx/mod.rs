//! DOCX package manipulation

pub mod footer;

// Re-export commonly used items
pub use footer::{footer_xml, is_footer_part, rewrite_footers, RewrittenDocx};
