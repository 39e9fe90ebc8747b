//! `chatty config`: Print the default configuration.

use chatty_config::AppConfig;

pub fn show() {
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
}
