use crate::cli::{Args, ColorChoice};

pub struct AppConfig {
    pub color_enabled: bool,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        let color_enabled = match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stderr),
        };

        AppConfig { color_enabled }
    }
}
