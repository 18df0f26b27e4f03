use shelf_core::config::{AppConfig, LoadOptions, Setting, TracedConfig};

pub fn run() -> String {
    match AppConfig::load_traced(LoadOptions::default()) {
        Ok(traced) => render(&traced),
        Err(error) => format!("config validation failed: {error}"),
    }
}

fn render(traced: &TracedConfig) -> String {
    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for setting in Setting::ALL {
        lines.push(format!(
            "- {} = {} (source: {})",
            setting.key(),
            traced.config.value_of(setting),
            traced.origin(setting)
        ));
    }
    lines.join("\n")
}
