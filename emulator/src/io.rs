//! Boundary with channel and device I/O.
//!
//! Devices live outside the processor. They receive an [`IoPacket`], fill in
//! its status and buffer, and hand it back. The processor only interprets the
//! status, turning a system error into a hardware check.

use parse_display::Display;
use tracing::{debug, warn};

use crate::interrupts::{HardwareCheckReason, MachineInterrupt};
use crate::word::Word36;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum IoFunction {
    Read,
    Write,
    GetInfo,
    Mount,
    Unmount,
    Reset,
}

/// Completion status reported by a device, passed through untouched
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display(style = "kebab-case")]
pub enum IoStatus {
    #[default]
    NotStarted,
    InProgress,
    Successful,
    BufferTooSmall,
    DeviceIsNotReady,
    InvalidBlockCount,
    InvalidBlockId,
    InvalidFunction,
    InvalidPacket,
    MediaAlreadyMounted,
    MediaNotMounted,
    WriteProtected,
    SystemError,
}

impl IoStatus {
    /// Whether the device is done with the packet
    #[must_use]
    pub const fn is_complete(self) -> bool {
        !matches!(self, Self::NotStarted | Self::InProgress)
    }

    /// The interrupt a status raises on the processor. Only system errors
    /// do; every other failure is left to the requester.
    #[must_use]
    pub const fn to_interrupt(self) -> Option<MachineInterrupt> {
        match self {
            Self::SystemError => Some(MachineInterrupt::HardwareCheck(
                HardwareCheckReason::Channel,
            )),
            _ => None,
        }
    }
}

/// Media description for mount requests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountInfo {
    pub media_name: String,
    pub write_protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoPacket {
    pub function: IoFunction,
    pub status: IoStatus,
    /// Device-specific detail for the status
    pub additional_status: u32,
    pub buffer: Vec<Word36>,
    pub block_id: Option<u64>,
    pub block_count: Option<u32>,
    pub mount_info: Option<MountInfo>,
}

impl IoPacket {
    #[must_use]
    pub fn new(function: IoFunction) -> Self {
        Self {
            function,
            status: IoStatus::NotStarted,
            additional_status: 0,
            buffer: Vec::new(),
            block_id: None,
            block_count: None,
            mount_info: None,
        }
    }

    /// Read `count` blocks starting at `block_id`
    #[must_use]
    pub fn read(block_id: u64, count: u32) -> Self {
        Self {
            block_id: Some(block_id),
            block_count: Some(count),
            ..Self::new(IoFunction::Read)
        }
    }

    #[must_use]
    pub fn write(block_id: u64, buffer: Vec<Word36>) -> Self {
        Self {
            block_id: Some(block_id),
            buffer,
            ..Self::new(IoFunction::Write)
        }
    }

    #[must_use]
    pub fn mount(info: MountInfo) -> Self {
        Self {
            mount_info: Some(info),
            ..Self::new(IoFunction::Mount)
        }
    }
}

/// A channel routes packets to its devices
pub trait Channel {
    /// Start the request described by `packet`. The device updates the
    /// packet in place, possibly before returning.
    fn submit(&mut self, packet: &mut IoPacket);

    /// Let in-flight requests progress; synchronous channels have nothing to do
    fn poll(&mut self, _packet: &mut IoPacket) {}
}

/// Submit a packet and poll until the device is done with it.
///
/// # Errors
///
/// The machine interrupt matching the final status, if it has one.
pub fn perform<C: Channel + ?Sized>(
    channel: &mut C,
    packet: &mut IoPacket,
) -> Result<IoStatus, MachineInterrupt> {
    channel.submit(packet);
    while !packet.status.is_complete() {
        channel.poll(packet);
    }

    debug!(function = %packet.function, status = %packet.status, "I/O complete");
    match packet.status.to_interrupt() {
        Some(interrupt) => {
            warn!(
                function = %packet.function,
                additional_status = packet.additional_status,
                "channel reported a system error"
            );
            Err(interrupt)
        }
        None => Ok(packet.status),
    }
}
