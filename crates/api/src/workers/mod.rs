pub mod sweep_uploads;
