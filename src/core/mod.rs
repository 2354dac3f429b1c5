//! Business logic, independent of the HTTP layer.
//!
//! Every operation takes a `SeaORM` connection (or transaction) and returns
//! [`crate::errors::Result`], so the same functions back the web handlers,
//! startup seeding and the tests.

/// Admin list views: search and sort over fixed column sets
pub mod admin;
/// KYC submission, review workflow and merge
pub mod kyc;
/// Countries, states and cities
pub mod location;
/// Team members shown on the content pages
pub mod team;
/// User registration, addresses and staff permissions
pub mod user;
