//! API endpoint handlers, one module per resource.

pub mod auth;
pub mod dashboard;
pub mod doctors;
pub mod feedback;
pub mod health;
pub mod medicines;
pub mod patients;
pub mod payments;
pub mod registrations;
pub mod users;
