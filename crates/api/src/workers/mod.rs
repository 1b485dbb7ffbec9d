pub mod refresh_status;
