//! Entity descriptor contract and the argument shapes repository calls accept.
//!
//! # Responsibility
//! - Bind an entity type to its table name, key attributes and result shape.
//! - Model "record or entity" and "scalar or mapping key" inputs as enums.
//!
//! # Invariants
//! - `PRIMARY_KEY` is ordered; its first element is the scalar-key target.
//! - `PRIMARY_KEY` must be non-empty (checked by `EntityRepository::new`).

use super::record::{Record, Value};
use crate::repo::RepoResult;
use std::borrow::Cow;

/// Typed row shape stored in one physical table.
///
/// ```
/// use entity_repo_core::model::record::{record, take_i64, take_text, text, Record, Value};
/// use entity_repo_core::{Entity, RepoResult};
///
/// struct Tag {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Tag {
///     const TABLE: &'static str = "tag";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///
///     fn from_record(mut record: Record) -> RepoResult<Self> {
///         Ok(Self {
///             id: take_i64(&mut record, "id")?,
///             name: take_text(&mut record, "name")?,
///         })
///     }
///
///     fn to_record(&self) -> Record {
///         record([("id", Value::Integer(self.id)), ("name", text(self.name.as_str()))])
///     }
/// }
///
/// assert_eq!(Tag::descriptor().first_key_attribute(), "id");
/// ```
pub trait Entity: Sized {
    /// Logical table name; executors resolve it to a physical name.
    const TABLE: &'static str;
    /// Ordered key attributes.
    const PRIMARY_KEY: &'static [&'static str];

    /// Materializes one entity from a fetched row.
    fn from_record(record: Record) -> RepoResult<Self>;

    /// Field mapping written by create/update calls.
    ///
    /// Columns the caller wants the engine to fill (auto-increment keys,
    /// defaults) should be left out rather than mapped to `NULL`.
    fn to_record(&self) -> Record;

    fn descriptor() -> Descriptor {
        Descriptor {
            table: Self::TABLE,
            primary_key: Self::PRIMARY_KEY,
        }
    }
}

/// Runtime view of an entity's fixed `(table, primary key)` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub table: &'static str,
    pub primary_key: &'static [&'static str],
}

impl Descriptor {
    /// Attribute a scalar key value binds to. Empty when no key is declared.
    pub fn first_key_attribute(&self) -> &'static str {
        self.primary_key.first().copied().unwrap_or_default()
    }

    pub fn is_composite(&self) -> bool {
        self.primary_key.len() > 1
    }

    pub fn is_key_attribute(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }
}

/// Write input: a raw record or an entity instance.
#[derive(Debug)]
pub enum Payload<'a, E> {
    Record(&'a Record),
    Entity(&'a E),
}

impl<'a, E: Entity> Payload<'a, E> {
    /// Field mapping carried by this payload.
    pub fn to_record(&self) -> Cow<'a, Record> {
        match self {
            Self::Record(record) => Cow::Borrowed(*record),
            Self::Entity(entity) => Cow::Owned(entity.to_record()),
        }
    }
}

impl<'a, E: Entity> From<&'a E> for Payload<'a, E> {
    fn from(value: &'a E) -> Self {
        Self::Entity(value)
    }
}

impl<'a, E> From<&'a Record> for Payload<'a, E> {
    fn from(value: &'a Record) -> Self {
        Self::Record(value)
    }
}

/// Primary key argument: one scalar for single-attribute keys, or a mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryKey {
    Scalar(Value),
    Composite(Record),
}

impl From<Value> for PrimaryKey {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::Integer(value))
    }
}

impl From<i32> for PrimaryKey {
    fn from(value: i32) -> Self {
        Self::Scalar(Value::Integer(i64::from(value)))
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::Text(value.to_string()))
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        Self::Scalar(Value::Text(value))
    }
}

impl From<Record> for PrimaryKey {
    fn from(value: Record) -> Self {
        Self::Composite(value)
    }
}

/// Delete input: a key, or an entity whose key attributes are projected.
#[derive(Debug)]
pub enum DeleteTarget<'a, E> {
    Key(PrimaryKey),
    Entity(&'a E),
}

impl<E> From<PrimaryKey> for DeleteTarget<'_, E> {
    fn from(value: PrimaryKey) -> Self {
        Self::Key(value)
    }
}

impl<E> From<Value> for DeleteTarget<'_, E> {
    fn from(value: Value) -> Self {
        Self::Key(value.into())
    }
}

impl<E> From<i64> for DeleteTarget<'_, E> {
    fn from(value: i64) -> Self {
        Self::Key(value.into())
    }
}

impl<E> From<i32> for DeleteTarget<'_, E> {
    fn from(value: i32) -> Self {
        Self::Key(value.into())
    }
}

impl<E> From<&str> for DeleteTarget<'_, E> {
    fn from(value: &str) -> Self {
        Self::Key(value.into())
    }
}

impl<E> From<String> for DeleteTarget<'_, E> {
    fn from(value: String) -> Self {
        Self::Key(value.into())
    }
}

impl<E> From<Record> for DeleteTarget<'_, E> {
    fn from(value: Record) -> Self {
        Self::Key(value.into())
    }
}

impl<'a, E: Entity> From<&'a E> for DeleteTarget<'a, E> {
    fn from(value: &'a E) -> Self {
        Self::Entity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeleteTarget, Descriptor, Entity, Payload, PrimaryKey};
    use crate::model::record::{record, take_text, text, Record, Value};
    use crate::repo::RepoResult;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct Setting {
        key: String,
    }

    impl Entity for Setting {
        const TABLE: &'static str = "setting";
        const PRIMARY_KEY: &'static [&'static str] = &["key"];

        fn from_record(mut record: Record) -> RepoResult<Self> {
            Ok(Self {
                key: take_text(&mut record, "key")?,
            })
        }

        fn to_record(&self) -> Record {
            record([("key", text(self.key.as_str()))])
        }
    }

    const ORDER_ITEM: Descriptor = Descriptor {
        table: "order_item",
        primary_key: &["order_id", "item_id"],
    };

    #[test]
    fn descriptor_reports_first_attribute_and_composite_shape() {
        assert_eq!(ORDER_ITEM.first_key_attribute(), "order_id");
        assert!(ORDER_ITEM.is_composite());
        assert!(ORDER_ITEM.is_key_attribute("item_id"));
        assert!(!ORDER_ITEM.is_key_attribute("qty"));
    }

    #[test]
    fn scalar_conversions_produce_scalar_keys() {
        assert_eq!(PrimaryKey::from(7_i64), PrimaryKey::Scalar(Value::Integer(7)));
        assert_eq!(PrimaryKey::from("sku-1"), PrimaryKey::Scalar(text("sku-1")));

        let mapping = record([("order_id", Value::Integer(3))]);
        assert_eq!(
            PrimaryKey::from(mapping.clone()),
            PrimaryKey::Composite(mapping)
        );
    }

    #[test]
    fn text_keys_convert_into_delete_targets() {
        let target: DeleteTarget<'_, Setting> = "theme".into();
        assert!(matches!(
            target,
            DeleteTarget::Key(PrimaryKey::Scalar(Value::Text(ref key))) if key == "theme"
        ));
    }

    #[test]
    fn record_and_entity_references_convert_into_payloads() {
        let fields = record([("key", text("theme"))]);
        let from_record: Payload<'_, Setting> = (&fields).into();
        assert!(matches!(from_record.to_record(), Cow::Borrowed(borrowed) if borrowed == &fields));

        let setting = Setting {
            key: "theme".to_string(),
        };
        let from_entity: Payload<'_, Setting> = (&setting).into();
        assert_eq!(from_entity.to_record().into_owned(), fields);
    }
}
