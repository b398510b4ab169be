//! Application-layer tagged encoding: tags, primitive
//! values, the `AppValue` tagged union, and composite (`BACnetXxx`)
//! structures built from them.

pub mod ascii;
pub mod composite;
pub mod primitive;
pub mod tag;
pub mod value;

pub use primitive::{Date, DayField, MonthField, Time};
pub use tag::{Tag, TagClass, TagLength};
pub use value::AppValue;
