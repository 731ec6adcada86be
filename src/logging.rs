//! Log output setup.
//!
//! The subscriber is installed before anything else runs, at `INFO`. The level
//! from the config file is applied afterwards through [`LogLevelHandle`], so
//! messages logged while the config is being loaded are not lost.

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{reload, FmtSubscriber};

type ReloadFn = Box<dyn Fn(LevelFilter) -> Result<(), reload::Error>>;

/// Changes the max level of an installed subscriber.
pub struct LogLevelHandle {
    reload: ReloadFn,
}

impl LogLevelHandle {
    pub fn set_level(&self, level: Level) -> Result<(), reload::Error> {
        (self.reload)(LevelFilter::from_level(level))
    }
}

impl std::fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLevelHandle").finish_non_exhaustive()
    }
}

pub fn build_subscriber<W>(writer: W) -> (impl Subscriber + Send + Sync + 'static, LogLevelHandle)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
        .pretty()
        .with_filter_reloading();

    let handle = builder.reload_handle();
    let level = LogLevelHandle {
        reload: Box::new(move |filter| handle.reload(filter)),
    };
    (builder.finish(), level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{info, warn};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn messages_before_level_change_are_kept() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let (subscriber, level) = build_subscriber(move || writer.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        info!("loading config before reload");
        level.set_level(Level::WARN).unwrap();
        info!("chatty message after reload");
        warn!("warning after reload");

        let output = buffer.contents();
        assert!(output.contains("loading config before reload"));
        assert!(!output.contains("chatty message after reload"));
        assert!(output.contains("warning after reload"));
    }
}
