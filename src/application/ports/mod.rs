//! Ports - the seams between use cases and adapters

pub mod outbound;
