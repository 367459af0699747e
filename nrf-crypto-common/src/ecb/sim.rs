//! Register-level software model of the ECB peripheral.
//!
//! Models both hardware generations closely enough to exercise the driver without silicon: the
//! flat model only encrypts when `ECBDATAPTR` points at the driver's data, the descriptor model
//! walks its job lists and decodes the reversed key from `KEY.VALUE`. Faults can be injected to
//! drive the driver's error paths.

use core::cell::Cell;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::InMemoryRegister;

use super::vdma::ATTRIBUTE_ECB;
use super::{EcbData, EcbRegisters, Generation, Status, VdmaJob, KEY_SIZE};
use crate::cipher::AES_BLOCK_SIZE;

/// Misbehaviour to inject into the next operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fault {
    /// Raise the error event.
    Error,
    /// Never finish.
    Stall,
}

/// Simulated ECB peripheral.
///
/// The driver can own the model or borrow it (`&SimEcb` also implements [`EcbRegisters`]) so a
/// test can keep inspecting it.
pub struct SimEcb {
    generation: Generation,
    events_end: InMemoryRegister<u32>,
    events_error: InMemoryRegister<u32>,
    inten: InMemoryRegister<u32>,
    data_ptr: InMemoryRegister<u32>,
    key: [InMemoryRegister<u32>; 4],
    in_ptr: InMemoryRegister<u32>,
    out_ptr: InMemoryRegister<u32>,
    latency: u32,
    remaining: Cell<Option<u32>>,
    fault: Cell<Option<Fault>>,
    starts: Cell<u32>,
    stops: Cell<u32>,
}

impl SimEcb {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            events_end: InMemoryRegister::new(0),
            events_error: InMemoryRegister::new(0),
            inten: InMemoryRegister::new(0b11),
            data_ptr: InMemoryRegister::new(0),
            key: [
                InMemoryRegister::new(0),
                InMemoryRegister::new(0),
                InMemoryRegister::new(0),
                InMemoryRegister::new(0),
            ],
            in_ptr: InMemoryRegister::new(0),
            out_ptr: InMemoryRegister::new(0),
            latency: 0,
            remaining: Cell::new(None),
            fault: Cell::new(None),
            starts: Cell::new(0),
            stops: Cell::new(0),
        }
    }

    /// A flat-pointer (nRF52) peripheral.
    pub fn flat() -> Self {
        Self::new(Generation::Flat)
    }

    /// A job-descriptor (nRF54L) peripheral.
    pub fn descriptor() -> Self {
        Self::new(Generation::Descriptor)
    }

    /// Number of status polls an operation stays busy for.
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Makes the next started operation misbehave.
    pub fn inject(&self, fault: Fault) {
        self.fault.set(Some(fault));
    }

    /// Points the peripheral somewhere else, as another user of the hardware would.
    pub fn clobber_pointers(&self) {
        self.data_ptr.set(0);
        self.in_ptr.set(0);
        self.out_ptr.set(0);
    }

    pub fn starts(&self) -> u32 {
        self.starts.get()
    }

    pub fn stops(&self) -> u32 {
        self.stops.get()
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.inten.get() != 0
    }

    /// Content of the `KEY.VALUE` registers.
    pub fn key_registers(&self) -> [u32; 4] {
        [
            self.key[0].get(),
            self.key[1].get(),
            self.key[2].get(),
            self.key[3].get(),
        ]
    }

    /// The key the descriptor hardware actually uses.
    fn register_key(&self) -> [u8; KEY_SIZE] {
        let mut key = [0; KEY_SIZE];
        for (bytes, word) in key.chunks_exact_mut(4).zip(self.key_registers()) {
            bytes.copy_from_slice(&word.to_le_bytes());
        }
        key.reverse();
        key
    }

    fn job_is_valid(job: &VdmaJob, buffer: &[u8; AES_BLOCK_SIZE]) -> bool {
        job.ptr() == buffer.as_ptr() as u32
            && job.attributes() == ATTRIBUTE_ECB
            && job.size() == AES_BLOCK_SIZE
    }

    /// Key the operation runs with, `None` if the peripheral would fault.
    fn fetch_key(&self, data: &EcbData) -> Option<[u8; KEY_SIZE]> {
        match self.generation {
            Generation::Flat => {
                if self.data_ptr.get() != data as *const _ as u32 {
                    return None;
                }
                Some(data.key)
            }
            Generation::Descriptor => {
                let lists_linked = self.in_ptr.get() == data.in_jobs.as_ptr() as u32
                    && self.out_ptr.get() == data.out_jobs.as_ptr() as u32
                    && data.in_jobs[1] == VdmaJob::NULL
                    && data.out_jobs[1] == VdmaJob::NULL;
                if !lists_linked
                    || !Self::job_is_valid(&data.in_jobs[0], &data.clear_text)
                    || !Self::job_is_valid(&data.out_jobs[0], &data.cipher_text)
                {
                    return None;
                }
                Some(self.register_key())
            }
        }
    }

    fn sim_init(&self) {
        self.inten.set(0);
        self.sim_stop();
    }

    fn sim_point_at(&self, data: &mut EcbData) {
        match self.generation {
            Generation::Flat => self.data_ptr.set(data as *mut _ as u32),
            Generation::Descriptor => {
                data.link_jobs();
                self.in_ptr.set(data.in_jobs.as_ptr() as u32);
                self.out_ptr.set(data.out_jobs.as_ptr() as u32);
            }
        }
    }

    fn sim_load_key(&self, key: &[u8; KEY_SIZE]) {
        if self.generation == Generation::Descriptor {
            for (reg, word) in self.key.iter().zip(super::vdma::key_words(key)) {
                reg.set(word);
            }
        }
    }

    fn sim_set_transfer_size(&self, data: &mut EcbData, len: usize) {
        if self.generation == Generation::Descriptor {
            data.set_job_size(len);
        }
    }

    fn sim_clear_events(&self) {
        self.events_end.set(0);
        self.events_error.set(0);
    }

    fn sim_start(&self, data: &mut EcbData) {
        self.starts.set(self.starts.get() + 1);

        match self.fault.take() {
            Some(Fault::Error) => {
                self.events_error.set(1);
                return;
            }
            Some(Fault::Stall) => {
                self.remaining.set(Some(u32::MAX));
                return;
            }
            None => {}
        }

        let key = match self.fetch_key(data) {
            Some(key) => key,
            None => {
                self.events_error.set(1);
                return;
            }
        };

        let cipher = Aes128::new(GenericArray::from_slice(&key));
        let mut block = GenericArray::clone_from_slice(&data.clear_text);
        cipher.encrypt_block(&mut block);
        data.cipher_text.copy_from_slice(&block);

        self.remaining.set(Some(self.latency));
    }

    fn sim_stop(&self) {
        self.stops.set(self.stops.get() + 1);
        self.remaining.set(None);
    }

    fn sim_status(&self) -> Status {
        if let Some(remaining) = self.remaining.get() {
            if remaining == u32::MAX {
                // Stalled until stopped.
                return Status::Busy;
            }
            if remaining > 0 {
                self.remaining.set(Some(remaining - 1));
                return Status::Busy;
            }
            self.remaining.set(None);
            self.events_end.set(1);
        }

        if self.events_error.get() != 0 {
            Status::Error
        } else if self.events_end.get() != 0 {
            Status::Done
        } else {
            Status::Busy
        }
    }
}

macro_rules! impl_registers {
    ($ty:ty) => {
        impl EcbRegisters for $ty {
            fn generation(&self) -> Generation {
                self.generation
            }

            fn init(&mut self) {
                self.sim_init()
            }

            fn point_at(&mut self, data: &mut EcbData) {
                self.sim_point_at(data)
            }

            fn load_key(&mut self, key: &[u8; KEY_SIZE]) {
                self.sim_load_key(key)
            }

            fn set_transfer_size(&mut self, data: &mut EcbData, len: usize) {
                self.sim_set_transfer_size(data, len)
            }

            fn clear_events(&mut self) {
                self.sim_clear_events()
            }

            fn start(&mut self, data: &mut EcbData) {
                self.sim_start(data)
            }

            fn stop(&mut self) {
                self.sim_stop()
            }

            fn status(&mut self) -> Status {
                self.sim_status()
            }
        }
    };
}

impl_registers!(SimEcb);
impl_registers!(&SimEcb);
