//! # Request dispatcher
//!
//! Fans the identity request out over every transport the host exposes, without
//! waiting for any of them. Each attempt is isolated: a transport that fails is
//! logged and the next one is tried.
//!
//! Dispatch runs in two passes over the [plan](plan):
//!
//! 1. attach a listener for every receiving transport (message channel, page
//!    messages, deferred callback),
//! 2. send the request on every sending transport, in priority order.
//!
//! Listening first means a container that answers synchronously from inside
//! `postMessage` is still heard.

use tracing::warn;

use crate::host::HostEnvironment;
use crate::probe::probe;
use crate::registry::ListenerRegistry;
use crate::session::Mailbox;
use crate::transport::Transport;

/// Outcome of one dispatch, for diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub planned: Vec<Transport>,
    pub listening: Vec<Transport>,
    pub sent: Vec<Transport>,
    pub failed: Vec<(Transport, String)>,
}

impl DispatchReport {
    /// Nothing was attached and nothing went out: only the deadline can end
    /// this session.
    pub fn is_exhausted(&self) -> bool {
        self.listening.is_empty() && self.sent.is_empty()
    }
}

/// Transports to exercise, given what the host exposes.
///
/// The dedicated message channel makes the accessor, the native message handler
/// and the webview bridge redundant; page messages and the deferred callback are
/// kept as universal fallbacks.
pub fn plan(available: &[Transport]) -> Vec<Transport> {
    let exclusive = available.contains(&Transport::MessageChannel);
    let mut planned: Vec<Transport> = available
        .iter()
        .copied()
        .filter(|transport| !(exclusive && transport.is_channel_alternate()))
        .collect();
    planned.sort();
    planned.dedup();
    planned
}

/// Probe `host`, attach listeners into `registry` and send every request.
///
/// Replies, including the accessor's synchronous one, go to `mailbox`.
pub fn dispatch<H: HostEnvironment + ?Sized>(
    host: &H,
    registry: &mut ListenerRegistry,
    mailbox: &Mailbox,
    debug: bool,
) -> DispatchReport {
    let mut report = DispatchReport {
        planned: plan(&probe(host)),
        ..DispatchReport::default()
    };
    diag!(debug, planned = ?report.planned, "Dispatching TownPass identity request");

    for transport in report.planned.clone() {
        if !transport.listens() {
            continue;
        }
        match registry.attach(host, transport, mailbox.handler(transport)) {
            Ok(()) => report.listening.push(transport),
            Err(err) => {
                diag!(debug, %transport, error = %err, "Listener attach failed");
                report.failed.push((transport, err.to_string()));
            }
        }
    }

    for transport in report.planned.clone() {
        if !transport.sends() {
            continue;
        }
        match host.send(transport, transport.request()) {
            Ok(reply) => {
                diag!(debug, %transport, "Identity request sent");
                report.sent.push(transport);
                if let Some(reply) = reply {
                    mailbox.offer(transport, reply);
                }
            }
            Err(err) => {
                diag!(debug, %transport, error = %err, "Identity request failed");
                report.failed.push((transport, err.to_string()));
            }
        }
    }

    if report.is_exhausted() && debug {
        warn!("No TownPass transport could be used, waiting for the deadline");
    }
    report
}
