use std::ffi::OsString;

use tracing::instrument;

use crate::{
    engine::{EngineConfig, EngineFactory},
    error::Result,
};

/// Thread limit exported by other OCR backends. When set to 1 it starves the
/// engine's inference threads, so it is hidden while an engine is built.
pub const THREAD_LIMIT_VAR: &str = "OMP_THREAD_LIMIT";

/// Removes an environment variable for the guard's lifetime and puts the
/// previous value back on drop, including when construction fails.
pub struct EnvVarGuard {
    key: &'static str,
    saved: Option<OsString>,
}

impl EnvVarGuard {
    pub fn unset(key: &'static str) -> Self {
        let saved = std::env::var_os(key);
        if saved.is_some() {
            std::env::remove_var(key);
        }
        Self { key, saved }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(value) = self.saved.take() {
            std::env::set_var(self.key, value);
        }
    }
}

struct EngineHandle<E> {
    engine: E,
    lang: String,
}

/// Owner of the single live engine.
///
/// At most one engine exists at a time. It is rebuilt when another language
/// is requested or after [`EngineCache::invalidate`]. The cache takes no
/// locks: callers must guarantee a single caller at a time.
pub struct EngineCache<F: EngineFactory> {
    factory: F,
    handle: Option<EngineHandle<F::Engine>>,
}

impl<F: EngineFactory> EngineCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handle: None,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Language of the cached engine, if any.
    pub fn language(&self) -> Option<&str> {
        self.handle.as_ref().map(|handle| handle.lang.as_str())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn acquire(&mut self, lang: &str) -> Result<&F::Engine> {
        let handle = match self.handle.take() {
            Some(handle) if handle.lang == lang => self.handle.insert(handle),
            stale => {
                // Only one engine may be alive, release the old one first.
                drop(stale);
                let engine = self.build(lang)?;
                self.handle.insert(EngineHandle {
                    engine,
                    lang: lang.to_string(),
                })
            }
        };
        Ok(&handle.engine)
    }

    pub fn invalidate(&mut self) {
        self.handle = None;
    }

    fn build(&self, lang: &str) -> Result<F::Engine> {
        log::debug!("Creating engine for language {lang}");
        let _thread_limit = EnvVarGuard::unset(THREAD_LIMIT_VAR);
        self.factory.create(&EngineConfig::for_language(lang))
    }
}
