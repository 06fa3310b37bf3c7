pub mod config;
pub mod controller;
pub mod ejector;
pub mod grade;
pub mod grade_dispatcher;
pub mod linux;
pub mod presence_monitor;
pub mod signal_slot;
pub mod sorter_hal;
pub mod sorter_hal_factory;
pub mod sorter_hal_mock;
