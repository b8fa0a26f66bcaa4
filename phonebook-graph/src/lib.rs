//! Starts a server that answers GraphQL requests about a directory of contacts.

#![warn(unreachable_pub)]

mod axum_factory;
mod configuration;
mod directory;
pub mod error;
mod executable;
mod filter;
mod id;
mod person;
mod schema;
mod source;
mod store;

pub use axum_factory::PhonebookServer;
pub use axum_factory::make_router;
pub use configuration::Configuration;
pub use configuration::Cors;
pub use configuration::PersonsApi;
pub use configuration::Server;
pub use configuration::Store;
pub use configuration::generate_config_schema;
pub use directory::Directory;
pub use executable::Executable;
pub use executable::main;
pub use filter::PhoneFilter;
pub use filter::YesNo;
pub use id::IdGenerator;
pub use id::SequentialIdGenerator;
pub use id::UuidGenerator;
pub use person::Address;
pub use person::NewPerson;
pub use person::Person;
pub use person::PersonId;
pub use schema::Mutation;
pub use schema::PhonebookSchema;
pub use schema::Query;
pub use schema::build_schema;
pub use schema::sdl;
pub use source::LocalSource;
pub use source::PersonSource;
pub use source::RestSource;
pub use store::PersonStore;
pub use store::Persons;
pub use store::demo_persons;
