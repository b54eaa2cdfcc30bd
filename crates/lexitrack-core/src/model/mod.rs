mod dates;
mod milestone;
mod profile;
mod progress;
mod records;
mod schedule;

pub use dates::{lenient_date, parse_lenient_date};
pub use milestone::*;
pub use profile::*;
pub use progress::*;
pub use records::*;
pub use schedule::*;

#[cfg(test)]
mod tests;
