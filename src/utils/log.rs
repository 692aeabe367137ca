use log::LevelFilter;

pub struct Logger;

impl Logger {
    pub fn init(level: LevelFilter) {
        let mut builder: env_logger::Builder = colog::default_builder();
        builder
            .filter_level(level)
            .filter_module("hyper_util", LevelFilter::Warn)
            .filter_module("reqwest", LevelFilter::Warn);
        builder.init();
    }
}
