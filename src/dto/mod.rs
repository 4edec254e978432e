pub mod application_dto;
pub mod invitation_dto;
