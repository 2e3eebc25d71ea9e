//! `queries`: list the configured query set.

use crate::app_config::Settings;

pub fn run_queries_command(settings: &Settings) {
    for (name, expression) in &settings.queries {
        println!("{name} = {expression}");
    }
}
