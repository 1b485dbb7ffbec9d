pub mod activity;
pub mod group;
pub mod presentation;
pub mod project;
pub mod resource;
pub mod user;
