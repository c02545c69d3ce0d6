#![cfg_attr(windows, windows_subsystem = "windows")]
// Windows-only implementation lives in src/windows_main.rs
#[cfg(windows)]
mod windows_main;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    // Rolling daily log under the app's data dir; the guard must live as
    // long as the app or buffered lines are lost.
    let _guard = match topmost::config::load_or_default() {
        Ok((_, paths)) => {
            std::fs::create_dir_all(&paths.log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(&paths.log_dir, "topmost.log");
            let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
            let env = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env)
                .with_ansi(false)
                .with_writer(nb_writer)
                .try_init();
            Some(guard)
        }
        Err(_) => None,
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "topmost starting");
    windows_main::main()
}

// Non-Windows stub builds cleanly and informs the user.
#[cfg(not(windows))]
fn main() {
    println!("TopMost is Windows-only. Build on Windows to run.");
}
