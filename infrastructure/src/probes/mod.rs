//! Hardware probes
//!
//! Each probe implements [`HardwareProbe`](argos_application::ports::hardware_probe::HardwareProbe)
//! and shells out to the usual Linux utilities. Missing utilities simply
//! contribute no devices.
//!
//! | Probe | Finds |
//! |-------|-------|
//! | [`UsbProbe`] | HackRF, USRP, RTL-SDR, WiFi adapters, Bluetooth controllers |
//! | [`SerialProbe`] | NMEA GPS, gpsd, cellular modems, USB serial adapters |
//! | [`NetworkProbe`] | networked USRPs, Kismet, HackRF API, OpenWebRX |

pub mod command;
pub mod network;
pub mod serial;
pub mod usb;

use std::sync::Arc;
use std::time::Duration;

use argos_application::ports::hardware_probe::HardwareProbe;

pub use network::NetworkProbe;
pub use serial::SerialProbe;
pub use usb::UsbProbe;

/// The standard probe set
pub fn default_probes(command_timeout: Duration, network: NetworkProbe) -> Vec<Arc<dyn HardwareProbe>> {
    vec![
        Arc::new(UsbProbe::new(command_timeout)),
        Arc::new(SerialProbe::new(command_timeout)),
        Arc::new(network),
    ]
}
