use dirs;
use fern;
use log::{Level, LevelFilter};
use std::io;

/// Initialize logging with the fern logger
pub fn log<F: Fn(Level, &str) + Send + Sync + 'static>(callback: F) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .level(LevelFilter::Debug)
        // Handed to front ends, which may display the messages as they see fit.
        .chain(fern::Output::call(move |record| {
            callback(record.level(), &format!("{}", record.args()))
        }))
        .chain({
            let mut logger = fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{} distimage{}] {}",
                        record.level(),
                        match (record.file(), record.line()) {
                            (Some(file), Some(line)) => format!(":{}:{}", file, line),
                            _ => "".into(),
                        },
                        message
                    ))
                })
                .chain(io::stderr());

            match fern::log_file("/tmp/distimage.log") {
                Ok(log) => logger = logger.chain(log),
                Err(why) => {
                    eprintln!("failed to create log file at /tmp/distimage.log: {}", why);
                }
            };

            if let Some(home) = dirs::home_dir() {
                match fern::log_file(&home.join("distimage.log")) {
                    Ok(log) => logger = logger.chain(log),
                    Err(why) => {
                        eprintln!("failed to set up logging for the home directory: {}", why);
                    }
                }
            }

            logger
        })
        .apply()?;

    Ok(())
}
