pub mod field;
pub mod patch;
pub mod record;

pub use field::{Field, FieldChange};
pub use patch::RecordPatch;
pub use record::{Creator, CreatorType, ItemType, Record, RecordKey};
