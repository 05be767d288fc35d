pub mod activities_repo;
pub mod pre_registrations_repo;
pub mod registrations_repo;
