//! Domain model: value objects, ordered sequences, aggregates and events
pub mod aggregates;
pub mod events;
pub mod sequence;
pub mod value_objects;
