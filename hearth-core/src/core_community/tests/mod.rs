//! Manager tests against the in-memory directory

mod authority_tests;
mod invite_tests;
