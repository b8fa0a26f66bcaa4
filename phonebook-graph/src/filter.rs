//! Phone presence filter for person listings.

use async_graphql::Enum;

use crate::person::Person;

/// The `phone` argument of `allPersons` and `allPersonsApi`.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum YesNo {
    Yes,
    No,
}

/// Narrows a listing by whether people have a phone.
///
/// Unlike [`YesNo`], the absence of a filter is an explicit variant so the predicate stays
/// exhaustive.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PhoneFilter {
    /// Only people with a phone.
    Yes,
    /// Only people without a phone.
    No,
    /// Everybody.
    #[default]
    Unset,
}

impl From<Option<YesNo>> for PhoneFilter {
    fn from(value: Option<YesNo>) -> Self {
        match value {
            Some(YesNo::Yes) => PhoneFilter::Yes,
            Some(YesNo::No) => PhoneFilter::No,
            None => PhoneFilter::Unset,
        }
    }
}

impl PhoneFilter {
    pub fn matches(self, person: &Person) -> bool {
        match self {
            PhoneFilter::Yes => person.has_phone(),
            PhoneFilter::No => !person.has_phone(),
            PhoneFilter::Unset => true,
        }
    }

    /// Keeps the matching people, in their original order.
    pub fn apply<'a, I>(self, persons: I) -> Vec<Person>
    where
        I: IntoIterator<Item = &'a Person>,
    {
        persons
            .into_iter()
            .filter(|person| self.matches(person))
            .cloned()
            .collect()
    }
}
