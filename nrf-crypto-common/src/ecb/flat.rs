//! Flat-pointer ECB (nRF52 series).

use super::{EcbData, EcbRegisters, Generation, Status, KEY_SIZE};
use crate::pac::ECB;

impl EcbRegisters for ECB {
    fn generation(&self) -> Generation {
        Generation::Flat
    }

    fn init(&mut self) {
        // Disable all interrupts
        self.intenclr
            .write(|w| w.endecb().clear().errorecb().clear());

        // NOTE(unsafe) 1 is a valid pattern to write to this register
        self.tasks_stopecb.write(|w| unsafe { w.bits(1) });
    }

    fn point_at(&mut self, data: &mut EcbData) {
        // EcbData is repr(C) and starts with the key, cleartext, ciphertext layout
        let data_ptr = data as *mut _ as u32;

        // NOTE(unsafe) Any 32bits pattern is safe to write to this register
        self.ecbdataptr.write(|w| unsafe { w.bits(data_ptr) });
    }

    // The key is read from `EcbData` along with the cleartext.
    fn load_key(&mut self, _key: &[u8; KEY_SIZE]) {}

    // Always one block.
    fn set_transfer_size(&mut self, _data: &mut EcbData, _len: usize) {}

    fn clear_events(&mut self) {
        self.events_endecb.reset();
        self.events_errorecb.reset();
    }

    fn start(&mut self, _data: &mut EcbData) {
        // NOTE(unsafe) 1 is a valid pattern to write to this register
        self.tasks_startecb.write(|w| unsafe { w.bits(1) });
    }

    fn stop(&mut self) {
        // NOTE(unsafe) 1 is a valid pattern to write to this register
        self.tasks_stopecb.write(|w| unsafe { w.bits(1) });
    }

    fn status(&mut self) -> Status {
        if self.events_errorecb.read().bits() != 0 {
            Status::Error
        } else if self.events_endecb.read().bits() != 0 {
            Status::Done
        } else {
            Status::Busy
        }
    }
}
