//! Odontogram chart: layout, editing, findings and persistence.

mod editor;
mod findings;
mod layout;
mod repository;

pub use editor::*;
pub use findings::*;
pub use layout::*;
pub use repository::*;
