//! USB CDC ACM device carrying the operator console.
//!
//! A single serial interface carries commands and schedule payloads from the
//! host, and replies plus report lines back to it.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(target_os = "none")]
use embassy_usb::class::cdc_acm::{CdcAcmClass, ControlChanged, Receiver, Sender, State};
#[cfg(target_os = "none")]
use embassy_usb::driver::Driver;
#[cfg(target_os = "none")]
use embassy_usb::{Builder, Config, UsbDevice};

pub const MAX_PACKET_SIZE: u16 = 64;

/// pid.codes test VID with a product id for this board.
const VENDOR_ID: u16 = 0x1209;
const PRODUCT_ID: u16 = 0x0002;

/// Descriptor and control-transfer buffer sizes.
#[cfg(target_os = "none")]
const DESCRIPTOR_BUFFER_LEN: usize = 128;
#[cfg(target_os = "none")]
const SMALL_BUFFER_LEN: usize = 64;

/// Strings reported in the device descriptor.
#[derive(Clone, Copy, Debug)]
pub struct UsbDeviceStrings {
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
}

impl Default for UsbDeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: "Puzzle Alarm",
            product: "Puzzle Alarm Clock",
            serial_number: None,
        }
    }
}

/// Copies `line` into `frame` followed by CRLF and returns the framed length.
///
/// An overlong line is cut short so the terminator always fits.
pub fn frame_line(line: &str, frame: &mut [u8]) -> usize {
    let body = line.len().min(frame.len().saturating_sub(2));
    frame[..body].copy_from_slice(&line.as_bytes()[..body]);
    let mut len = body;
    for byte in *b"\r\n" {
        if len < frame.len() {
            frame[len] = byte;
            len += 1;
        }
    }
    len
}

/// Static buffers borrowed by the device for its whole lifetime.
#[cfg(target_os = "none")]
pub struct UsbDeviceStorage {
    config: [u8; DESCRIPTOR_BUFFER_LEN],
    bos: [u8; SMALL_BUFFER_LEN],
    msos: [u8; SMALL_BUFFER_LEN],
    control: [u8; SMALL_BUFFER_LEN],
    serial: State<'static>,
}

#[cfg(target_os = "none")]
impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            config: [0; DESCRIPTOR_BUFFER_LEN],
            bos: [0; SMALL_BUFFER_LEN],
            msos: [0; SMALL_BUFFER_LEN],
            control: [0; SMALL_BUFFER_LEN],
            serial: State::new(),
        }
    }
}

/// Console endpoints after splitting the CDC ACM class.
#[cfg(target_os = "none")]
pub struct CdcAcmHandle<D: Driver<'static>> {
    pub sender: Sender<'static, D>,
    pub receiver: Receiver<'static, D>,
    pub control: ControlChanged<'static>,
}

#[cfg(target_os = "none")]
pub struct UsbConsole<D: Driver<'static>> {
    pub device: UsbDevice<'static, D>,
    pub console: CdcAcmHandle<D>,
}

#[cfg(target_os = "none")]
impl<D: Driver<'static>> UsbConsole<D> {
    pub fn new(
        driver: D,
        storage: &'static mut UsbDeviceStorage,
        strings: UsbDeviceStrings,
    ) -> Self {
        let mut config = Config::new(VENDOR_ID, PRODUCT_ID);
        config.manufacturer = Some(strings.manufacturer);
        config.product = Some(strings.product);
        config.serial_number = strings.serial_number;
        config.max_packet_size_0 = 64;
        config.max_power = 100;
        // Miscellaneous class with IADs so hosts bind the CDC driver.
        config.device_class = 0xEF;
        config.device_sub_class = 0x02;
        config.device_protocol = 0x01;
        config.composite_with_iads = true;

        let mut builder = Builder::new(
            driver,
            config,
            &mut storage.config,
            &mut storage.bos,
            &mut storage.msos,
            &mut storage.control,
        );
        let (sender, receiver, control) =
            CdcAcmClass::new(&mut builder, &mut storage.serial, MAX_PACKET_SIZE)
                .split_with_control();

        Self {
            device: builder.build(),
            console: CdcAcmHandle {
                sender,
                receiver,
                control,
            },
        }
    }
}
