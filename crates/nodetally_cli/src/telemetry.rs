use tracing_subscriber::{EnvFilter, fmt};

/// Install the fmt subscriber. `RUST_LOG` wins over `verbosity`; a second call is a no-op.
pub fn init_tracing(verbosity: u8) {
    let c_default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(c_default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(0);
        init_tracing(2);
        tracing::info!("subscriber installed");
    }
}
