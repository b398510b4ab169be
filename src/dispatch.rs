//! APDU dispatch: maps a `(pdu_type, service_choice)` pair
//! to a registered handler and builds the reply APDU.
//!
//! Handlers are plain closures, not tied to [`crate::object_model::ObjectDatabase`]
//! directly — a handler that needs object access captures its own
//! `Rc<RefCell<dyn ObjectDatabase>>` (or an `&mut` borrow, in the
//! single-threaded case), the way any other stateful closure would.
//! This keeps the dispatcher itself free of any assumption about how
//! object data is stored.

use std::collections::HashMap;

use log::{debug, warn};

use crate::apdu::Apdu;
use crate::error::{AbortReason, RejectReason};

/// What a confirmed-service handler decided to reply with.
pub enum ConfirmedOutcome {
    /// Acknowledge with no data (`BACnet-SimpleACK-PDU`).
    Simple,
    /// Acknowledge with service-specific ack data, already encoded.
    Complex(Vec<u8>),
    /// `BACnet-Error-PDU`.
    Error { error_class: u32, error_code: u32 },
    /// `BACnet-Reject-PDU`.
    Reject(RejectReason),
    /// `BACnet-Abort-PDU`.
    Abort(AbortReason),
    /// The handler chose not to reply at all (e.g. it will answer later,
    /// out of band, as with a segmented response built elsewhere).
    NoReply,
}

type ConfirmedHandler = Box<dyn FnMut(u8, &[u8]) -> ConfirmedOutcome>;
type UnconfirmedHandler = Box<dyn FnMut(&[u8])>;

/// Routes incoming confirmed/unconfirmed service requests to registered
/// handlers and turns the result back into a reply [`Apdu`].
///
/// Unrecognized confirmed service choices produce `BACnet-Reject` with
/// [`RejectReason::UnrecognizedService`] (ANSI/ASHRAE 135 clause 13.3);
/// unrecognized unconfirmed service choices are silently dropped, per
/// the same clause — an unconfirmed request has no peer waiting for an
/// answer, so there is nothing useful a reply could accomplish.
#[derive(Default)]
pub struct ServiceDispatcher {
    confirmed: HashMap<u8, ConfirmedHandler>,
    unconfirmed: HashMap<u8, UnconfirmedHandler>,
}

impl ServiceDispatcher {
    /// An empty dispatcher with no registered services.
    #[must_use]
    pub fn new() -> Self {
        Self { confirmed: HashMap::new(), unconfirmed: HashMap::new() }
    }

    /// Register (or replace) the handler for a confirmed service choice.
    pub fn register_confirmed<F>(&mut self, service_choice: u8, handler: F)
    where
        F: FnMut(u8, &[u8]) -> ConfirmedOutcome + 'static,
    {
        self.confirmed.insert(service_choice, Box::new(handler));
    }

    /// Register (or replace) the handler for an unconfirmed service choice.
    pub fn register_unconfirmed<F>(&mut self, service_choice: u8, handler: F)
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.unconfirmed.insert(service_choice, Box::new(handler));
    }

    /// Dispatch one incoming APDU, returning the reply APDU to send back
    /// (confirmed requests only) or `None` (unconfirmed requests, and
    /// anything that isn't a request at all — acks/errors/aborts/rejects
    /// are the TSM's concern, not the dispatcher's).
    pub fn dispatch(&mut self, apdu: &Apdu) -> Option<Apdu> {
        match apdu {
            Apdu::ConfirmedRequest { invoke_id, service_choice, service_data, .. } => {
                Some(self.dispatch_confirmed(*invoke_id, *service_choice, service_data))
            }
            Apdu::UnconfirmedRequest { service_choice, service_data } => {
                match self.unconfirmed.get_mut(service_choice) {
                    Some(handler) => handler(service_data),
                    None => {
                        debug!("dispatch: dropping unrecognized unconfirmed service {service_choice}");
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn dispatch_confirmed(&mut self, invoke_id: u8, service_choice: u8, service_data: &[u8]) -> Apdu {
        let outcome = match self.confirmed.get_mut(&service_choice) {
            Some(handler) => handler(invoke_id, service_data),
            None => {
                warn!("dispatch: rejecting unrecognized confirmed service {service_choice}");
                ConfirmedOutcome::Reject(RejectReason::UnrecognizedService)
            }
        };
        match outcome {
            ConfirmedOutcome::Simple => Apdu::SimpleAck { invoke_id, service_choice },
            ConfirmedOutcome::Complex(service_data) => Apdu::ComplexAck {
                segmented: false,
                more_follows: false,
                invoke_id,
                sequence_number: None,
                proposed_window_size: None,
                service_choice,
                service_data,
            },
            ConfirmedOutcome::Error { error_class, error_code } => {
                Apdu::Error { invoke_id, service_choice, error_class, error_code }
            }
            ConfirmedOutcome::Reject(reason) => Apdu::Reject { invoke_id, reason },
            ConfirmedOutcome::Abort(reason) => Apdu::Abort { server: true, invoke_id, reason },
            ConfirmedOutcome::NoReply => {
                // The caller asked for silence but dispatch() must return
                // something; SimpleAck is never sent for this case because
                // the TSM only calls dispatch() for requests that expect
                // one of the real outcomes above. Handlers that want true
                // silence should be registered on unconfirmed services instead.
                Apdu::Abort { server: true, invoke_id, reason: AbortReason::Other }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::confirmed;
    use crate::service::unconfirmed;

    fn confirmed_request(service_choice: u8, service_data: Vec<u8>) -> Apdu {
        Apdu::ConfirmedRequest {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: true,
            max_segments: 0,
            max_apdu: 5,
            invoke_id: 7,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
            service_data,
        }
    }

    #[test]
    fn unrecognized_confirmed_service_is_rejected() {
        let mut d = ServiceDispatcher::new();
        let reply = d.dispatch(&confirmed_request(200, vec![])).unwrap();
        assert!(matches!(reply, Apdu::Reject { reason: RejectReason::UnrecognizedService, invoke_id: 7 }));
    }

    #[test]
    fn unrecognized_unconfirmed_service_is_silently_dropped() {
        let mut d = ServiceDispatcher::new();
        let apdu = Apdu::UnconfirmedRequest { service_choice: 99, service_data: vec![] };
        assert!(d.dispatch(&apdu).is_none());
    }

    #[test]
    fn registered_confirmed_handler_produces_simple_ack() {
        let mut d = ServiceDispatcher::new();
        d.register_confirmed(confirmed::DEVICE_COMMUNICATION_CONTROL, |_invoke_id, _data| ConfirmedOutcome::Simple);
        let reply = d.dispatch(&confirmed_request(confirmed::DEVICE_COMMUNICATION_CONTROL, vec![])).unwrap();
        assert!(matches!(reply, Apdu::SimpleAck { invoke_id: 7, service_choice } if service_choice == confirmed::DEVICE_COMMUNICATION_CONTROL));
    }

    #[test]
    fn registered_confirmed_handler_produces_complex_ack() {
        let mut d = ServiceDispatcher::new();
        d.register_confirmed(confirmed::READ_PROPERTY, |_invoke_id, _data| ConfirmedOutcome::Complex(vec![1, 2, 3]));
        let reply = d.dispatch(&confirmed_request(confirmed::READ_PROPERTY, vec![])).unwrap();
        match reply {
            Apdu::ComplexAck { service_data, .. } => assert_eq!(service_data, vec![1, 2, 3]),
            other => panic!("expected ComplexAck, got {other:?}"),
        }
    }

    #[test]
    fn registered_unconfirmed_handler_runs_and_yields_no_reply() {
        let mut d = ServiceDispatcher::new();
        let mut seen = Vec::new();
        let received = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let received_clone = received.clone();
        d.register_unconfirmed(unconfirmed::WHO_IS, move |data| received_clone.borrow_mut().extend_from_slice(data));
        let apdu = Apdu::UnconfirmedRequest { service_choice: unconfirmed::WHO_IS, service_data: vec![9, 9] };
        assert!(d.dispatch(&apdu).is_none());
        seen.extend_from_slice(&received.borrow());
        assert_eq!(seen, vec![9, 9]);
    }
}
