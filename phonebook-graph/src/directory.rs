//! The operations behind every query and mutation.
//!
//! A [`Directory`] ties the store to an id generator and to the source used by `allPersonsApi`.
//! Each GraphQL resolver is a thin call into one of its methods.

use std::sync::Arc;

use crate::configuration::Configuration;
use crate::error::DirectoryError;
use crate::error::FetchError;
use crate::filter::PhoneFilter;
use crate::id::IdGenerator;
use crate::id::UuidGenerator;
use crate::person::NewPerson;
use crate::person::Person;
use crate::source::LocalSource;
use crate::source::PersonSource;
use crate::source::RestSource;
use crate::store::PersonStore;

#[derive(Clone)]
pub struct Directory {
    store: Arc<PersonStore>,
    ids: Arc<dyn IdGenerator>,
    source: Arc<dyn PersonSource>,
}

impl Directory {
    /// A directory over `store`, handing out UUIDs and listing `allPersonsApi` from the store.
    pub fn new(store: Arc<PersonStore>) -> Self {
        Self {
            source: Arc::new(LocalSource::new(store.clone())),
            store,
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_source(mut self, source: impl PersonSource) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Builds the store and source described by the configuration.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, FetchError> {
        let store = if configuration.store.seed {
            PersonStore::with_demo_data()
        } else {
            PersonStore::default()
        };
        let directory = Self::new(Arc::new(store));

        match &configuration.persons_api {
            Some(persons_api) => {
                tracing::info!(url = %persons_api.url, "allPersonsApi reads from the persons api");
                Ok(directory.with_source(RestSource::new(persons_api)?))
            }
            None => Ok(directory),
        }
    }

    pub fn store(&self) -> &Arc<PersonStore> {
        &self.store
    }

    pub fn person_count(&self) -> usize {
        self.store.read().count()
    }

    pub fn all_persons(&self, filter: PhoneFilter) -> Vec<Person> {
        tracing::debug!(?filter, "listing persons");
        filter.apply(self.store.read().all())
    }

    pub async fn all_persons_api(&self, filter: PhoneFilter) -> Result<Vec<Person>, DirectoryError> {
        let persons = self.source.fetch_persons().await?;
        Ok(filter.apply(&persons))
    }

    pub fn find_person(&self, name: &str) -> Option<Person> {
        tracing::debug!(name, "looking up person");
        self.store.read().find_by_name(name).cloned()
    }

    /// Creates a person under a fresh id.
    ///
    /// Fails without touching the store when the name is already taken.
    pub fn add_person(&self, new_person: NewPerson) -> Result<Person, DirectoryError> {
        let mut persons = self.store.write();
        if persons.find_index_by_name(&new_person.name).is_some() {
            tracing::warn!(name = %new_person.name, "rejected duplicate name");
            return Err(DirectoryError::DuplicateName {
                name: new_person.name,
            });
        }

        let person = Person::new(self.ids.next_id(), new_person);
        persons.append(person.clone());
        tracing::info!(id = %person.id, name = %person.name, "added person");
        Ok(person)
    }

    /// Replaces the phone of the person called `name`. `None` when nobody has that name.
    pub fn edit_number(&self, name: &str, phone: String) -> Option<Person> {
        let mut persons = self.store.write();
        let Some(index) = persons.find_index_by_name(name) else {
            tracing::debug!(name, "no person to edit");
            return None;
        };

        let updated = persons.all()[index].with_phone(phone);
        let replaced = persons.replace_at(index, updated.clone());
        debug_assert!(replaced.is_some(), "index {index} came from the same guard");
        tracing::info!(id = %updated.id, name = %updated.name, "updated phone");
        Some(updated)
    }
}
