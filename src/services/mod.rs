pub mod activities_service;
pub mod notification_service;
pub mod registration_service;
