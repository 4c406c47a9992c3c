//! Startup banner

use super::config::AppConfig;
use super::constants::APP_NAME;

/// Print the startup banner with endpoint and auth summary
pub fn print_banner(config: &AppConfig) {
    let host = config.server.host.as_str();
    let port = config.server.port;
    // Use localhost for display when binding to all interfaces
    let display_host = if matches!(host, "0.0.0.0" | "::" | "[::]") {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    const W: usize = 10;

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/api/v1/tools",
        "Tools:", display_host, port
    );

    if config.auth.enabled {
        println!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {:?} bearer tokens \x1b[90m(iss={}, aud={})\x1b[0m",
            "Auth:", config.auth.algorithm, config.auth.issuer, config.auth.audience
        );
    } else {
        println!(
            "  \x1b[31m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m DISABLED \x1b[90m(fallback credentials: {})\x1b[0m",
            "Auth:",
            if config.auth.fallback.is_some() {
                "configured"
            } else {
                "none"
            }
        );
    }

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }

    println!();
}
