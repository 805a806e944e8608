//! Database query functions organized by table.

pub mod commitments;
pub mod nullifiers;
pub mod settings;
pub mod signals;
