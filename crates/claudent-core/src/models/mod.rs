//! Domain models for the clinic core.

mod audit;
mod catalog;
mod history;
mod odontogram;
mod patient;
mod quotation;
mod session;

pub use audit::*;
pub use catalog::*;
pub use history::*;
pub use odontogram::*;
pub use patient::*;
pub use quotation::*;
pub use session::*;
