//! End-to-end scenarios exercising the NPDU/APDU/service stack together,
//! the way a peer on the wire would see them, plus the MS/TP zero-config
//! bring-up sequence.

use bacnet_core::address::ObjectId;
use bacnet_core::apdu::Apdu;
use bacnet_core::codec::value::AppValue;
use bacnet_core::dispatch::{ConfirmedOutcome, ServiceDispatcher};
use bacnet_core::mstp::automac::AutoMac;
use bacnet_core::npdu::{Npdu, Priority};
use bacnet_core::service::dcc::check_password;
use bacnet_core::service::{
    confirmed, unconfirmed, AtomicReadFileAck, AtomicReadFileRequest, FileAccess, FileAccessResult, IAm,
    ReadPropertyAck, ReadPropertyRequest, Segmentation, WhoIs,
};

fn wrap_unrouted(apdu: &Apdu) -> Vec<u8> {
    let mut apdu_bytes = [0u8; 64];
    let apdu_len = apdu.encode(&mut apdu_bytes).unwrap();
    let npdu = Npdu::unrouted(false, Priority::Normal);
    let mut frame = [0u8; 128];
    let npdu_len = npdu.encode(&mut frame).unwrap();
    frame[npdu_len..npdu_len + apdu_len].copy_from_slice(&apdu_bytes[..apdu_len]);
    frame[..npdu_len + apdu_len].to_vec()
}

#[test]
fn who_is_then_i_am_round_trips_over_the_wire() {
    let who_is = WhoIs { range: None };
    let mut service_data = [0u8; 8];
    let n = who_is.encode(&mut service_data).unwrap();
    let request = Apdu::UnconfirmedRequest { service_choice: unconfirmed::WHO_IS, service_data: service_data[..n].to_vec() };
    let wire = wrap_unrouted(&request);
    let (_npdu, consumed) = Npdu::decode(&wire).unwrap();
    let got_apdu = Apdu::decode(&wire[consumed..]).unwrap();
    assert_eq!(got_apdu, request);

    let i_am = IAm { device: ObjectId::new(8, 4_194_303), max_apdu: 1476, segmentation: Segmentation::None, vendor_id: 0 };
    let mut ack_data = [0u8; 16];
    let n = i_am.encode(&mut ack_data).unwrap();
    let reply = Apdu::UnconfirmedRequest { service_choice: unconfirmed::I_AM, service_data: ack_data[..n].to_vec() };
    let wire = wrap_unrouted(&reply);
    let (_npdu, consumed) = Npdu::decode(&wire).unwrap();
    let got_reply = Apdu::decode(&wire[consumed..]).unwrap();
    assert_eq!(got_reply, reply);
    if let Apdu::UnconfirmedRequest { service_data, .. } = got_reply {
        let (decoded, _) = IAm::decode(&service_data).unwrap();
        assert_eq!(decoded, i_am);
    } else {
        panic!("expected UnconfirmedRequest");
    }
}

#[test]
fn read_property_device_object_identifier_round_trips() {
    let device = ObjectId::new(8, 1);
    let request = ReadPropertyRequest { object: device, property: 75, array_index: None };
    let mut req_data = [0u8; 16];
    let n = request.encode(&mut req_data).unwrap();
    let confirmed_apdu = Apdu::ConfirmedRequest {
        segmented: false,
        more_follows: false,
        segmented_response_accepted: true,
        max_segments: 0,
        max_apdu: 5,
        invoke_id: 1,
        sequence_number: None,
        proposed_window_size: None,
        service_choice: confirmed::READ_PROPERTY,
        service_data: req_data[..n].to_vec(),
    };

    let mut dispatcher = ServiceDispatcher::new();
    dispatcher.register_confirmed(confirmed::READ_PROPERTY, move |_invoke_id, data| {
        let (req, _) = ReadPropertyRequest::decode(data).unwrap();
        let ack = ReadPropertyAck {
            object: req.object,
            property: req.property,
            array_index: req.array_index,
            property_value: vec![AppValue::ObjectId(req.object)],
        };
        let mut buf = [0u8; 32];
        let n = ack.encode(&mut buf).unwrap();
        ConfirmedOutcome::Complex(buf[..n].to_vec())
    });

    let reply = dispatcher.dispatch(&confirmed_apdu).unwrap();
    match reply {
        Apdu::ComplexAck { invoke_id, service_choice, service_data, .. } => {
            assert_eq!(invoke_id, 1);
            assert_eq!(service_choice, confirmed::READ_PROPERTY);
            let (ack, _) = ReadPropertyAck::decode(&service_data).unwrap();
            assert_eq!(ack.property_value, vec![AppValue::ObjectId(device)]);
        }
        other => panic!("expected ComplexAck, got {other:?}"),
    }
}

#[test]
fn atomic_read_file_stream_returns_requested_span() {
    let request = AtomicReadFileRequest { file: ObjectId::new(10, 1), access: FileAccess::Stream { start_position: 0, count: 128 } };
    let mut req_data = [0u8; 16];
    let n = request.encode(&mut req_data).unwrap();
    let (decoded, _) = AtomicReadFileRequest::decode(&req_data[..n]).unwrap();
    assert_eq!(decoded, request);

    let ack = AtomicReadFileAck {
        end_of_file: true,
        result: FileAccessResult::Stream { file_start_position: 0, file_data: b"Joshua-Mary-Anna-Christopher".to_vec() },
    };
    let mut ack_data = [0u8; 64];
    let n = ack.encode(&mut ack_data).unwrap();
    let (got, consumed) = AtomicReadFileAck::decode(&ack_data[..n]).unwrap();
    assert_eq!(got, ack);
    assert_eq!(consumed, n);
}

#[test]
fn atomic_read_file_record_returns_sixteen_identical_records() {
    let records: Vec<Vec<u8>> = std::iter::repeat(b"Joshua-Mary-Anna-Christopher".to_vec()).take(16).collect();
    let ack = AtomicReadFileAck {
        end_of_file: true,
        result: FileAccessResult::Record { file_start_record: 0, record_count: 16, file_records: records.clone() },
    };
    let mut buf = vec![0u8; 1024];
    let n = ack.encode(&mut buf).unwrap();
    let (got, consumed) = AtomicReadFileAck::decode(&buf[..n]).unwrap();
    assert_eq!(got, ack);
    assert_eq!(consumed, n);
    if let FileAccessResult::Record { file_records, .. } = got.result {
        assert_eq!(file_records.len(), 16);
        assert!(file_records.iter().all(|r| r == &records[0]));
    } else {
        panic!("expected Record result");
    }
}

#[test]
fn device_communication_control_disable_honors_password() {
    // Configured password "valid"; matching password disables
    // communication, mismatched password is refused.
    assert!(check_password(Some(b"valid"), Some(b"valid")));
    assert!(!check_password(Some(b"valid"), Some(b"wrong")));

    // A dispatcher wired the way an application would: DCC succeeds or
    // fails depending on whether the supplied password checks out.
    let configured_password = b"valid".to_vec();
    let mut dispatcher = ServiceDispatcher::new();
    dispatcher.register_confirmed(confirmed::DEVICE_COMMUNICATION_CONTROL, move |_invoke_id, data| {
        use bacnet_core::service::DeviceCommunicationControl;
        let (req, _) = DeviceCommunicationControl::decode(data).unwrap();
        if check_password(Some(&configured_password), req.password.as_deref()) {
            ConfirmedOutcome::Simple
        } else {
            ConfirmedOutcome::Error {
                error_class: bacnet_core::service::dcc::ERROR_CLASS_SECURITY,
                error_code: bacnet_core::service::dcc::ERROR_CODE_PASSWORD_FAILURE,
            }
        }
    });

    use bacnet_core::service::{DccState, DeviceCommunicationControl};
    let req = DeviceCommunicationControl { time_duration: Some(60), state: DccState::Disable, password: Some(b"valid".to_vec()) };
    let mut data = [0u8; 32];
    let n = req.encode(&mut data).unwrap();
    let apdu = Apdu::ConfirmedRequest {
        segmented: false,
        more_follows: false,
        segmented_response_accepted: true,
        max_segments: 0,
        max_apdu: 5,
        invoke_id: 3,
        sequence_number: None,
        proposed_window_size: None,
        service_choice: confirmed::DEVICE_COMMUNICATION_CONTROL,
        service_data: data[..n].to_vec(),
    };
    assert!(matches!(dispatcher.dispatch(&apdu).unwrap(), Apdu::SimpleAck { invoke_id: 3, .. }));

    let bad_req = DeviceCommunicationControl { time_duration: Some(60), state: DccState::Disable, password: Some(b"nope".to_vec()) };
    let mut data = [0u8; 32];
    let n = bad_req.encode(&mut data).unwrap();
    let apdu = Apdu::ConfirmedRequest {
        segmented: false,
        more_follows: false,
        segmented_response_accepted: true,
        max_segments: 0,
        max_apdu: 5,
        invoke_id: 4,
        sequence_number: None,
        proposed_window_size: None,
        service_choice: confirmed::DEVICE_COMMUNICATION_CONTROL,
        service_data: data[..n].to_vec(),
    };
    match dispatcher.dispatch(&apdu).unwrap() {
        Apdu::Error { invoke_id: 4, error_class, error_code, .. } => {
            assert_eq!(error_class, bacnet_core::service::dcc::ERROR_CLASS_SECURITY);
            assert_eq!(error_code, bacnet_core::service::dcc::ERROR_CODE_PASSWORD_FAILURE);
        }
        other => panic!("expected Error PDU, got {other:?}"),
    }
}

#[test]
fn zero_config_auto_mac_converges_on_the_one_untargeted_slot() {
    let mut auto = AutoMac::new();
    for dest in 32u8..127 {
        if dest == 65 {
            continue;
        }
        auto.observe_pfm(dest);
        auto.observe_other(dest);
    }
    auto.observe_pfm(65);

    assert!(auto.cycle_complete());
    assert!(auto.free_address_count() > 0);
    assert_eq!(auto.free_address_mac(0), Some(65));
}
