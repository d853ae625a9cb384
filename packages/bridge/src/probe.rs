//! Channel probe: which transports does this host expose right now?

use crate::host::HostEnvironment;
use crate::transport::Transport;

/// Ordered list of transports whose capability test succeeds.
///
/// Detection only, nothing is sent. Hosts report a capability test that
/// errors as a missing transport, so probing cannot fail.
pub fn probe<H: HostEnvironment + ?Sized>(host: &H) -> Vec<Transport> {
    Transport::ALL
        .into_iter()
        .filter(|transport| host.is_available(*transport))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SimulatedHost;

    #[test]
    fn test_probe_returns_priority_order() {
        let host = SimulatedHost::with_transports([
            Transport::DeferredCallback,
            Transport::WebViewBridge,
            Transport::MessageChannel,
        ]);
        assert_eq!(
            probe(&host),
            vec![
                Transport::MessageChannel,
                Transport::WebViewBridge,
                Transport::DeferredCallback,
            ]
        );
    }

    #[test]
    fn test_probe_has_no_side_effects() {
        let host = SimulatedHost::with_transports(Transport::ALL);
        let _ = probe(&host);
        assert!(host.sent().is_empty());
        assert_eq!(host.active_listeners(), 0);
    }

    #[test]
    fn test_bare_browser_has_nothing() {
        let host = SimulatedHost::new();
        assert!(probe(&host).is_empty());
    }
}
