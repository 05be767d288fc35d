pub mod activities;
pub mod pre_registrations;
pub mod registrations;

pub use activities::{ActivityCapacityRow, ActivityRow};
pub use pre_registrations::PreRegistrationRow;
pub use registrations::RegistrationRow;
