pub mod activities;
pub mod groups;
pub mod presentations;
pub mod projects;
pub mod resources;
pub mod users;
