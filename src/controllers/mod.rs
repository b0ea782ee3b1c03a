pub mod home_controller;
pub mod scheduler_controller;
