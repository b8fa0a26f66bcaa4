//! The GraphQL schema: query and mutation roots.

use async_graphql::EmptySubscription;
use async_graphql::ErrorExtensions;
use async_graphql::Object;
use async_graphql::Result;
use async_graphql::Schema;
use async_graphql::extensions::Tracing;

use crate::directory::Directory;
use crate::filter::YesNo;
use crate::person::NewPerson;
use crate::person::Person;
use crate::store::PersonStore;

pub type PhonebookSchema = Schema<Query, Mutation, EmptySubscription>;

pub struct Query {
    directory: Directory,
}

#[Object]
impl Query {
    async fn person_count(&self) -> usize {
        self.directory.person_count()
    }

    async fn all_persons(&self, phone: Option<YesNo>) -> Vec<Option<Person>> {
        nullable_items(self.directory.all_persons(phone.into()))
    }

    async fn all_persons_api(&self, phone: Option<YesNo>) -> Result<Vec<Option<Person>>> {
        self.directory
            .all_persons_api(phone.into())
            .await
            .map(nullable_items)
            .map_err(|err| err.extend())
    }

    async fn find_person(&self, name: String) -> Option<Person> {
        self.directory.find_person(&name)
    }
}

pub struct Mutation {
    directory: Directory,
}

#[Object]
impl Mutation {
    async fn add_person(
        &self,
        name: String,
        phone: Option<String>,
        street: String,
        city: String,
    ) -> Result<Option<Person>> {
        self.directory
            .add_person(NewPerson {
                name,
                phone,
                street,
                city,
            })
            .map(Some)
            .map_err(|err| err.extend())
    }

    async fn edit_number(&self, name: String, phone: String) -> Option<Person> {
        self.directory.edit_number(&name, phone)
    }
}

// Lists are `[Person]!` on the wire: the list is always there, its items are nullable.
fn nullable_items(persons: Vec<Person>) -> Vec<Option<Person>> {
    persons.into_iter().map(Some).collect()
}

/// Builds the executable schema over `directory`.
///
/// With `introspection` off, `__schema` and `__type` resolve to `null`.
pub fn build_schema(directory: Directory, introspection: bool) -> PhonebookSchema {
    let builder = Schema::build(
        Query {
            directory: directory.clone(),
        },
        Mutation { directory },
        EmptySubscription,
    )
    .extension(Tracing);

    if introspection {
        builder.finish()
    } else {
        builder.disable_introspection().finish()
    }
}

/// The schema definition language of the phonebook.
pub fn sdl() -> String {
    build_schema(Directory::new(PersonStore::default().into()), true).sdl()
}
