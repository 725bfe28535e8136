//! Callback interfaces implemented by the host process.

/// Receives every log record emitted by the process.
pub trait LogCallback: Send + Sync {
    /// `level` uses 0 = panic … 6 = trace; `time` is Unix milliseconds.
    fn on_log(&self, level: i16, time: i64, message: &str);
}

/// Receives the model name of every persisted-entity mutation.
pub trait DataChangeCallback: Send + Sync {
    fn on_change(&self, model: &str);
}

/// Receives listener lifecycle and process-exit notifications.
pub trait EventCallback: Send + Sync {
    /// A listener failed to bind or stopped with an error.
    fn on_start_error(&self, kind: &str, error: &str);
    /// A listener closed after a shutdown request.
    fn on_shutdown(&self, kind: &str);
    /// A fatal error asked the process to exit with `code`.
    fn on_process_exit(&self, code: i32);
}

/// Event sink used until a host installs its own: logs each notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventCallback for TracingEvents {
    fn on_start_error(&self, kind: &str, error: &str) {
        tracing::error!(listener = kind, error, "Listener failed");
    }

    fn on_shutdown(&self, kind: &str) {
        tracing::info!(listener = kind, "Listener shut down");
    }

    fn on_process_exit(&self, code: i32) {
        tracing::error!(code, "Exiting process");
        std::process::exit(code);
    }
}

impl DataChangeCallback for TracingEvents {
    fn on_change(&self, model: &str) {
        tracing::debug!(model, "Data changed");
    }
}
