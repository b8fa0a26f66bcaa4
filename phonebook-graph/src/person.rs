//! Contact records and the fields derived from them.

use std::fmt;

use async_graphql::ID;
use async_graphql::Object;
use async_graphql::SimpleObject;
use serde::Deserialize;
use serde::Serialize;

/// Value of the `check` field, whatever the person.
pub(crate) const CHECK: &str = "Kriz";

/// Opaque identifier of a [`Person`], assigned once at creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contact record, as held by the store.
///
/// The postal location is kept flat; the nested [`Address`] is only built when a
/// response asks for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub(crate) id: PersonId,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) phone: Option<String>,
    pub(crate) street: String,
    pub(crate) city: String,
}

impl Person {
    pub(crate) fn new(id: PersonId, new_person: NewPerson) -> Self {
        let NewPerson {
            name,
            phone,
            street,
            city,
        } = new_person;
        Self {
            id,
            name,
            phone,
            street,
            city,
        }
    }

    /// A copy of this record with its phone replaced. Every other field is kept as is.
    pub(crate) fn with_phone(&self, phone: String) -> Self {
        Self {
            phone: Some(phone),
            ..self.clone()
        }
    }

    pub(crate) fn has_phone(&self) -> bool {
        self.phone.is_some()
    }
}

#[Object]
impl Person {
    async fn name(&self) -> &str {
        &self.name
    }

    async fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    async fn address(&self) -> Address {
        Address::from(self)
    }

    async fn check(&self) -> &'static str {
        CHECK
    }

    async fn id(&self) -> ID {
        self.id.clone().into()
    }
}

/// Postal location of a person. Never stored, always projected from a [`Person`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl From<&Person> for Address {
    fn from(person: &Person) -> Self {
        Self {
            street: person.street.clone(),
            city: person.city.clone(),
        }
    }
}

/// Arguments of the `addPerson` mutation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
}

#[cfg(test)]
pub(crate) fn person(id: &str, name: &str, phone: Option<&str>, street: &str, city: &str) -> Person {
    Person {
        id: PersonId::new(id),
        name: name.to_string(),
        phone: phone.map(ToString::to_string),
        street: street.to_string(),
        city: city.to_string(),
    }
}
