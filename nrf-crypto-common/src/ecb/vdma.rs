//! Descriptor-based ECB (`ECB00` on the nRF54L series).
//!
//! Cleartext and ciphertext move through EasyDMA job lists. The key goes into the `KEY.VALUE`
//! registers in the reverse byte order of the flat generation.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_structs;
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};

use super::{EcbData, EcbRegisters, Generation, Status, KEY_SIZE};

/// EasyDMA attribute tag of ECB jobs (nRF54L15 OPS v0.5b, 8.7.2 EasyDMA).
pub const ATTRIBUTE_ECB: u8 = 11;

const SIZE_MASK: u32 = 0x00ff_ffff;
const ATTRIBUTE_SHIFT: u32 = 24;

/// One EasyDMA job: buffer address, 24-bit size and 8-bit attribute.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct VdmaJob {
    ptr: u32,
    size_attributes: u32,
}

impl VdmaJob {
    /// Terminates a job list.
    pub const NULL: Self = Self {
        ptr: 0,
        size_attributes: 0,
    };

    /// An empty ECB job on the buffer at `ptr`.
    pub const fn ecb(ptr: u32) -> Self {
        Self {
            ptr,
            size_attributes: (ATTRIBUTE_ECB as u32) << ATTRIBUTE_SHIFT,
        }
    }

    pub fn ptr(&self) -> u32 {
        self.ptr
    }

    pub fn size(&self) -> usize {
        (self.size_attributes & SIZE_MASK) as usize
    }

    pub fn attributes(&self) -> u8 {
        (self.size_attributes >> ATTRIBUTE_SHIFT) as u8
    }

    pub fn set_size(&mut self, size: usize) {
        self.size_attributes = (self.size_attributes & !SIZE_MASK) | (size as u32 & SIZE_MASK);
    }
}

/// Converts a key into the `KEY.VALUE` register words of the descriptor generation.
///
/// The peripheral expects the key bytes reversed relative to the flat generation. Getting this
/// wrong still encrypts, just with a different key.
pub fn key_words(key: &[u8; KEY_SIZE]) -> [u32; 4] {
    let mut reversed = *key;
    reversed.reverse();

    let mut words = [0; 4];
    for (word, bytes) in words.iter_mut().zip(reversed.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    words
}

// `ECB00` register block
register_structs! {
    pub RegisterBlock {
        (0x000 => tasks_start: WriteOnly<u32>),
        (0x004 => tasks_stop: WriteOnly<u32>),
        (0x008 => _reserved0),
        (0x100 => events_end: ReadWrite<u32>),
        (0x104 => events_error: ReadWrite<u32>),
        (0x108 => _reserved1),
        (0x308 => intenclr: ReadWrite<u32>),
        (0x30c => _reserved2),
        (0x4c0 => errorstatus: ReadOnly<u32>),
        (0x4c4 => _reserved3),
        (0x510 => key: [WriteOnly<u32>; 4]),
        (0x520 => _reserved4),
        (0x530 => in_ptr: ReadWrite<u32>),
        (0x534 => _reserved5),
        (0x538 => out_ptr: ReadWrite<u32>),
        (0x53c => @END),
    }
}

const INTEN_END: u32 = 1 << 0;
const INTEN_ERROR: u32 = 1 << 1;

/// The `ECB00` peripheral.
pub struct Ecb00 {
    regs: &'static RegisterBlock,
}

// The register block is memory-mapped IO, not shared Rust state.
unsafe impl Send for Ecb00 {}

impl Ecb00 {
    /// Secure mapping of `ECB00`.
    pub const ADDRESS: usize = 0x5004_b000;
    /// Non-secure mapping of `ECB00`.
    pub const ADDRESS_NS: usize = 0x4004_b000;

    /// Creates a handle to the `ECB00` instance at `address`.
    ///
    /// # Safety
    ///
    /// `address` must be one of the `ECB00` mappings and no other handle to it may exist.
    pub unsafe fn steal(address: usize) -> Self {
        Self {
            regs: &*(address as *const RegisterBlock),
        }
    }

    /// Value of the `ERRORSTATUS` register after a failed operation.
    pub fn error_status(&self) -> u32 {
        self.regs.errorstatus.get()
    }
}

impl EcbRegisters for Ecb00 {
    fn generation(&self) -> Generation {
        Generation::Descriptor
    }

    fn init(&mut self) {
        self.regs.intenclr.set(INTEN_END | INTEN_ERROR);
        self.regs.tasks_stop.set(1);
    }

    fn point_at(&mut self, data: &mut EcbData) {
        data.link_jobs();
        self.regs.in_ptr.set(data.in_jobs.as_ptr() as u32);
        self.regs.out_ptr.set(data.out_jobs.as_ptr() as u32);
    }

    fn load_key(&mut self, key: &[u8; KEY_SIZE]) {
        for (reg, word) in self.regs.key.iter().zip(key_words(key)) {
            reg.set(word);
        }
    }

    fn set_transfer_size(&mut self, data: &mut EcbData, len: usize) {
        data.set_job_size(len);
    }

    fn clear_events(&mut self) {
        self.regs.events_end.set(0);
        self.regs.events_error.set(0);
    }

    fn start(&mut self, _data: &mut EcbData) {
        self.regs.tasks_start.set(1);
    }

    fn stop(&mut self) {
        self.regs.tasks_stop.set(1);
    }

    fn status(&mut self) -> Status {
        if self.regs.events_error.get() != 0 {
            error!("ECB00 ERRORSTATUS {}", self.regs.errorstatus.get());
            Status::Error
        } else if self.regs.events_end.get() != 0 {
            Status::Done
        } else {
            Status::Busy
        }
    }
}
