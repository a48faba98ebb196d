pub mod identifiers;
pub mod patient;
