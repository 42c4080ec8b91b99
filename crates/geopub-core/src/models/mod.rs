pub mod email;
pub mod enrichment;
pub mod event;
pub mod geometry;
pub mod publication;
pub mod source;
pub mod status;
pub mod temporal;

pub use email::*;
pub use enrichment::*;
pub use event::*;
pub use geometry::*;
pub use publication::*;
pub use source::*;
pub use status::*;
pub use temporal::*;
