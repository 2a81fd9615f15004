//! Port availability checks.

use std::net::TcpListener;

use tracing::debug;

/// Check if a port is free on all interfaces by binding to it.
///
/// The listener is dropped immediately, releasing the port.
pub fn is_port_available(port: u16) -> bool {
    match TcpListener::bind(("0.0.0.0", port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(e) => {
            debug!(port = %port, error = %e, "port is not available");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_port_is_unavailable() {
        let listener = TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_available(port));
        drop(listener);
        assert!(is_port_available(port));
    }
}
