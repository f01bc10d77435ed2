//! The JSON codec (spec §4.G, module G): a schema-driven deserializer and a
//! selective, projection-aware serializer.

pub mod deserializer;
pub mod serializer;

pub use deserializer::{deserialize, json_to_value};
pub use serializer::{serialize, Projection};
