/*!
Minimal illustrative binary: builds a `Who-Is` unconfirmed-request APDU,
wraps it in an NPDU, and prints the resulting bytes. There's no
transport here — no UART, no BVLL/IP framing — just the encode path,
so this is meant to be piped into whatever link the caller has, or read
as a worked example of how the pieces in this crate fit together.
*/
use anyhow::Result;
use clap::Parser;
use log::info;

use bacnet_core::apdu::Apdu;
use bacnet_core::npdu::{Npdu, Priority};
use bacnet_core::service::{unconfirmed, WhoIs};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Low end of the device-instance range to query. Omit both bounds
    /// to ask every device on the network to respond.
    #[arg(long)]
    low: Option<u32>,

    /// High end of the device-instance range to query.
    #[arg(long)]
    high: Option<u32>,

    #[arg(short, default_value = "0")]
    verbose: usize,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("bacnet_core")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let range = match (opt.low, opt.high) {
        (Some(low), Some(high)) => Some((low, high)),
        (None, None) => None,
        _ => anyhow::bail!("--low and --high must be given together"),
    };
    let who_is = WhoIs { range };

    let mut service_data = [0u8; 8];
    let n = who_is.encode(&mut service_data)?;
    let apdu = Apdu::UnconfirmedRequest {
        service_choice: unconfirmed::WHO_IS,
        service_data: service_data[..n].to_vec(),
    };

    let mut apdu_bytes = [0u8; 32];
    let apdu_len = apdu.encode(&mut apdu_bytes)?;

    let npdu = Npdu::unrouted(false, Priority::Normal);
    let mut frame = [0u8; 64];
    let npdu_len = npdu.encode(&mut frame)?;
    frame[npdu_len..npdu_len + apdu_len].copy_from_slice(&apdu_bytes[..apdu_len]);
    let total = npdu_len + apdu_len;

    info!("Who-Is, range={range:?}, {total} bytes");
    let hex: Vec<String> = frame[..total].iter().map(|b| format!("{b:02x}")).collect();
    println!("{}", hex.join(" "));

    Ok(())
}
