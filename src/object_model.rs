//! Object-model interface.
//!
//! This crate implements the wire protocol, not a device's object
//! database — that's an external collaborator. What it defines is the
//! seam: a trait an embedding application
//! implements once, so [`crate::service::read_property`] and
//! [`crate::dispatch::ServiceDispatcher`] handlers can be written
//! against it without knowing whether the backing store is a static
//! array of objects on a microcontroller or something backed by a file.

use crate::address::ObjectId;
use crate::codec::value::AppValue;
use crate::error::ServiceError;

/// One BACnet property, identified the way `ReadProperty`/`WriteProperty`
/// address it on the wire: a property identifier plus an optional array
/// index (`None` means "the property as a whole", `Some(0)` means "the
/// array's length").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    /// `BACnetPropertyIdentifier`, e.g. 85 for `present-value`.
    pub property_identifier: u32,
    /// `BACnetArrayIndex`, present only for array-valued properties.
    pub property_array_index: Option<u32>,
}

/// Implemented once by the embedding application over however it stores
/// objects. Every method is synchronous and non-blocking: the protocol
/// engine calls these from within a single request/reply turn and has
/// no segmentation-aware way to wait on a slow backing store.
pub trait ObjectDatabase {
    /// The full list of property identifiers this object exposes, in
    /// the order `ReadPropertyMultiple`/`read-property-list` would
    /// enumerate them. Returns an empty slice for an
    /// instance this database doesn't hold.
    fn property_lists(&self, object: ObjectId) -> &[u32];

    /// Read one property's value.
    ///
    /// # Errors
    /// [`ServiceError::MissingRequiredField`] if `object` doesn't exist
    /// or `property` isn't one of [`ObjectDatabase::property_lists`]'s
    /// entries for it.
    fn read_property(&self, object: ObjectId, property: PropertyRef) -> Result<AppValue, ServiceError>;

    /// Write one property's value.
    ///
    /// # Errors
    /// [`ServiceError::MissingRequiredField`] if the object/property
    /// doesn't exist; [`ServiceError::ValueOutOfRange`] if `value`'s
    /// type or range doesn't match the property; implementations may
    /// also reject writes to read-only properties this way.
    fn write_property(&mut self, object: ObjectId, property: PropertyRef, value: AppValue) -> Result<(), ServiceError>;

    /// This object's `object-name` property, used to answer `Who-Has`
    /// by name and to populate `I-Am`-adjacent discovery replies.
    fn object_name(&self, object: ObjectId) -> Option<&str>;

    /// True if `object` is present in this database (distinct from "no
    /// properties", which a present-but-empty object could also have).
    fn valid_instance(&self, object: ObjectId) -> bool;

    /// Map an object identifier to a stable, dense index, for
    /// implementations that back objects with a flat array rather than
    /// a map. Returns `None` for an object this database doesn't hold.
    fn instance_to_index(&self, object: ObjectId) -> Option<usize>;
}

/// The multi-threaded counterpart to [`ObjectDatabase`], for embeddings
/// whose backing store is itself remote or otherwise async — a handler
/// registered with a
/// [`crate::dispatch::ServiceDispatcher`] can still only call this
/// synchronously, so a `run_async`-driven embedding typically awaits
/// these calls before invoking the synchronous dispatcher.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncObjectDatabase {
    /// See [`ObjectDatabase::read_property`].
    async fn read_property(&self, object: ObjectId, property: PropertyRef) -> Result<AppValue, ServiceError>;

    /// See [`ObjectDatabase::write_property`].
    async fn write_property(&self, object: ObjectId, property: PropertyRef, value: AppValue) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A minimal in-memory `ObjectDatabase`, used only to exercise the
    /// trait's contract in tests; not a real object model.
    struct TestDb {
        names: HashMap<ObjectId, String>,
        values: HashMap<(ObjectId, u32), AppValue>,
        props: Vec<u32>,
    }

    impl ObjectDatabase for TestDb {
        fn property_lists(&self, object: ObjectId) -> &[u32] {
            if self.names.contains_key(&object) { &self.props } else { &[] }
        }

        fn read_property(&self, object: ObjectId, property: PropertyRef) -> Result<AppValue, ServiceError> {
            self.values
                .get(&(object, property.property_identifier))
                .cloned()
                .ok_or(ServiceError::MissingRequiredField("present-value"))
        }

        fn write_property(
            &mut self,
            object: ObjectId,
            property: PropertyRef,
            value: AppValue,
        ) -> Result<(), ServiceError> {
            if !self.names.contains_key(&object) {
                return Err(ServiceError::MissingRequiredField("object"));
            }
            self.values.insert((object, property.property_identifier), value);
            Ok(())
        }

        fn object_name(&self, object: ObjectId) -> Option<&str> {
            self.names.get(&object).map(String::as_str)
        }

        fn valid_instance(&self, object: ObjectId) -> bool {
            self.names.contains_key(&object)
        }

        fn instance_to_index(&self, object: ObjectId) -> Option<usize> {
            if self.valid_instance(object) { Some(object.instance() as usize) } else { None }
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let object = ObjectId::new(0, 1);
        let mut db = TestDb { names: HashMap::new(), values: HashMap::new(), props: vec![85] };
        db.names.insert(object, "AI-1".to_string());
        let prop = PropertyRef { property_identifier: 85, property_array_index: None };
        db.write_property(object, prop, AppValue::Real(21.5)).unwrap();
        assert_eq!(db.read_property(object, prop).unwrap(), AppValue::Real(21.5));
    }

    #[test]
    fn unknown_object_is_rejected() {
        let db = TestDb { names: HashMap::new(), values: HashMap::new(), props: vec![] };
        let object = ObjectId::new(0, 1);
        assert!(!db.valid_instance(object));
        assert!(db.instance_to_index(object).is_none());
    }
}
