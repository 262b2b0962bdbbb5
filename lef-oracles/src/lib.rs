pub mod catalogue;
pub mod reporter;

pub use catalogue::{ScoreSet, REPORTED_SUB_INDICES};
pub use reporter::ReporterClient;
