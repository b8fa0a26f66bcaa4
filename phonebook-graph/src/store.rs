//! In-memory record store.
//!
//! [`Persons`] is the collection itself: insertion ordered, never reordered, and total (lookups
//! return `None` rather than failing). [`PersonStore`] shares it between requests behind a
//! reader/writer lock. A writer holds the lock for the whole of a check-then-write sequence,
//! so readers never see a half applied mutation.

use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;

use crate::person::NewPerson;
use crate::person::Person;
use crate::person::PersonId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Persons {
    persons: Vec<Person>,
}

impl Persons {
    pub fn new(persons: Vec<Person>) -> Self {
        Self { persons }
    }

    pub fn count(&self) -> usize {
        self.persons.len()
    }

    pub fn all(&self) -> &[Person] {
        &self.persons
    }

    /// Exact, case sensitive match.
    pub fn find_by_name(&self, name: &str) -> Option<&Person> {
        self.persons.iter().find(|person| person.name == name)
    }

    pub fn find_index_by_name(&self, name: &str) -> Option<usize> {
        self.persons.iter().position(|person| person.name == name)
    }

    pub(crate) fn append(&mut self, person: Person) {
        self.persons.push(person);
    }

    /// Swaps the record at `index` for `person`, handing back the one it replaced.
    pub(crate) fn replace_at(&mut self, index: usize, person: Person) -> Option<Person> {
        self.persons
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, person))
    }
}

/// The shared store every resolver goes through.
#[derive(Debug, Default)]
pub struct PersonStore {
    persons: RwLock<Persons>,
}

impl PersonStore {
    pub fn new(persons: Vec<Person>) -> Self {
        Self {
            persons: RwLock::new(Persons::new(persons)),
        }
    }

    /// A store holding the three demo contacts.
    pub fn with_demo_data() -> Self {
        Self::new(demo_persons())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Persons> {
        self.persons.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Persons> {
        self.persons.write()
    }

    /// A copy of the whole collection, in insertion order.
    pub fn snapshot(&self) -> Vec<Person> {
        self.read().all().to_vec()
    }
}

pub fn demo_persons() -> Vec<Person> {
    [
        (
            "4435454-4848-7dg478dg",
            "Cristian",
            Some("2378874"),
            "Avenida Senior",
            "San Francisco",
        ),
        (
            "78794dg77468-4848-7dg478dg",
            "Yourself",
            Some("123-456"),
            "Avenida Fullstack",
            "San Francisco",
        ),
        (
            "954dg754ae7-4848-7dg478dg",
            "Itzi",
            None,
            "Avenida Testing",
            "Rome",
        ),
    ]
    .into_iter()
    .map(|(id, name, phone, street, city)| {
        Person::new(
            PersonId::new(id),
            NewPerson {
                name: name.to_string(),
                phone: phone.map(ToString::to_string),
                street: street.to_string(),
                city: city.to_string(),
            },
        )
    })
    .collect()
}
