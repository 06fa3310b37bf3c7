pub mod stdin_command_source;
pub mod sysfs_gpio_sensor;
pub mod sysfs_pwm_servo;
