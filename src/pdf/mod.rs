//! PDF manipulation module

pub mod xobject;
pub mod page;
pub mod stamp;

// Re-export commonly used items
pub use xobject::StampImage;
pub use page::{page_box, PageBox};
pub use stamp::{placement, stamp_pdf, Placement, StampOptions};
