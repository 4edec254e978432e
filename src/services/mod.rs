pub mod application_service;
pub mod invitation_service;
