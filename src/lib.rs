#![warn(missing_docs)]
/*! A BACnet (ANSI/ASHRAE 135) application-layer engine: tagged/length-prefixed
wire encoding, composite data types, confirmed and unconfirmed service
codecs, the MS/TP datalink state machines, and the transaction/
segmentation runtime that ties them together.

# Architecture overview

A BACnet message on the wire is an NPDU (network layer prefix, [`npdu`])
wrapping an APDU ([`apdu`]): a PDU-type-tagged frame carrying one of the
service codecs in [`service`], itself built from the tagged primitives
and composite types in [`codec`]. Below the network layer sits the MS/TP
datalink ([`mstp`]), a token-passing RS-485 link whose two finite state
machines — frame reception and master-node token handling — are modeled
independently of any particular UART driver so they can be driven from
a real port, a test harness, or a simulated bus alike.

Two runtime pieces stitch these together without needing a global
singleton (see [`datalink::PortContext`] and [`tsm::Tsm`]):

```text
   [ Application / ObjectDatabase ]
              ↑        ↓
      [ ServiceDispatcher ]  ←── decodes/encodes via [ service::* ]
              ↑        ↓
           [ Tsm ]            ←── invoke-id + retry + segmentation
              ↑        ↓
       [ PortContext ]        ←── MS/TP FSMs, one instance per port
              ↑        ↓
        ( physical UART, out of scope )
```

A single-threaded application drives all of this from one poll loop;
a multi-threaded one instead runs the datalink adapter on its own
thread and hands completed NPDUs to the application over a channel —
both execution strategies are supported, matching this crate's
cooperative, no-mandatory-allocation design.

## Examples

Encoding a `Who-Is` request and wrapping it in an unconfirmed-request
APDU:

```
use bacnet_core::apdu::Apdu;
use bacnet_core::service::WhoIs;

let who_is = WhoIs { range: None };
let mut service_data = [0u8; 8];
let n = who_is.encode(&mut service_data).unwrap();

let apdu = Apdu::UnconfirmedRequest {
    service_choice: bacnet_core::service::unconfirmed::WHO_IS,
    service_data: service_data[..n].to_vec(),
};
let mut out = [0u8; 16];
apdu.encode(&mut out).unwrap();
```

## Links

* ANSI/ASHRAE Standard 135: the wire formats and state machines this
  crate implements.
*/

pub mod address;
pub mod apdu;
pub mod codec;
pub mod config;
pub mod datalink;
pub mod dispatch;
pub mod error;
pub mod mstp;
pub mod npdu;
pub mod object_model;
pub mod ring;
pub mod service;
pub mod tsm;

pub use error::{Error, Result};
