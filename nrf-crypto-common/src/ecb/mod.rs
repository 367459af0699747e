//! HAL interface to the AES electronic codebook mode encryption
//!
//! The ECB block supports 128 bit AES encryption (encryption only, not decryption) of one block
//! per trigger. Two generations of the peripheral exist:
//!
//! - the nRF52 `ECB`, which reads key and cleartext from (and writes ciphertext to) one flat data
//!   structure given by `ECBDATAPTR`;
//! - the nRF54L `ECB00`, which takes the key through registers and moves data through EasyDMA job
//!   lists given by `IN.PTR` / `OUT.PTR`.
//!
//! Both are driven through [`EcbRegisters`]. The driver owns the DMA-visible [`EcbData`] and hands
//! out at most one [`Session`] at a time.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{compiler_fence, AtomicBool, Ordering};

use crate::cipher::{
    Capabilities, CipherAlgo, CipherDevice, CipherMode, CipherOp, CipherPacket, CipherSession,
    SessionConfig, AES_BLOCK_SIZE,
};

#[cfg(any(
    feature = "52810",
    feature = "52832",
    feature = "52833",
    feature = "52840"
))]
mod flat;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod vdma;

#[cfg(test)]
mod tests;

pub use vdma::{Ecb00, VdmaJob};

/// AES-128 key size in bytes.
pub const KEY_SIZE: usize = 16;

/// Default bound on the number of completion polls of one block operation.
///
/// One ECB operation takes well under a thousand CPU cycles, so this only trips on a wedged
/// peripheral.
pub const DEFAULT_POLL_LIMIT: u32 = 100_000;

/// Errors reported by the ECB driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Only AES-128 ECB encryption in synchronous mode is supported.
    UnsupportedConfiguration,
    /// The session request carried no key.
    MissingKey,
    /// Another session holds the peripheral.
    PeripheralBusy,
    /// The input is not exactly one AES block.
    InvalidBlockSize,
    /// The output buffer cannot hold the result.
    OutputTooSmall,
    /// The peripheral raised its error event.
    HardwareFault,
    /// The peripheral did not finish within the configured poll limit.
    Timeout,
    /// The session has already been closed.
    SessionClosed,
}

impl Error {
    fn as_str(&self) -> &'static str {
        match self {
            Error::UnsupportedConfiguration => "unsupported cipher configuration",
            Error::MissingKey => "no key provided",
            Error::PeripheralBusy => "peripheral in use",
            Error::InvalidBlockSize => "only 16-byte blocks are supported",
            Error::OutputTooSmall => "output buffer too small",
            Error::HardwareFault => "ECB operation error",
            Error::Timeout => "ECB operation timed out",
            Error::SessionClosed => "session closed",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware generation of an ECB peripheral.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Generation {
    /// Flat `ECBDATAPTR` data structure (nRF51, nRF52).
    Flat,
    /// EasyDMA job lists and key registers (nRF54L).
    Descriptor,
}

/// Completion state of the operation in flight.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Busy,
    Done,
    Error,
}

#[repr(C)]
/// DMA-visible memory of the ECB peripheral.
///
/// The first three fields are the `ECBDATAPTR` layout of the flat generation. The job lists are
/// only read by the descriptor generation, each one terminated by a null job.
pub struct EcbData {
    key: [u8; KEY_SIZE],
    clear_text: [u8; AES_BLOCK_SIZE],
    cipher_text: [u8; AES_BLOCK_SIZE],
    in_jobs: [VdmaJob; 2],
    out_jobs: [VdmaJob; 2],
}

impl EcbData {
    /// Zeroed buffers, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            key: [0; KEY_SIZE],
            clear_text: [0; AES_BLOCK_SIZE],
            cipher_text: [0; AES_BLOCK_SIZE],
            in_jobs: [VdmaJob::NULL; 2],
            out_jobs: [VdmaJob::NULL; 2],
        }
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub fn clear_text(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.clear_text
    }

    pub fn cipher_text_mut(&mut self) -> &mut [u8; AES_BLOCK_SIZE] {
        &mut self.cipher_text
    }

    pub fn in_jobs(&self) -> &[VdmaJob; 2] {
        &self.in_jobs
    }

    pub fn out_jobs(&self) -> &[VdmaJob; 2] {
        &self.out_jobs
    }

    /// (Re)writes both job lists so they describe the scratch blocks.
    pub fn link_jobs(&mut self) {
        let clear_text = self.clear_text.as_ptr() as u32;
        let cipher_text = self.cipher_text.as_ptr() as u32;
        self.in_jobs = [VdmaJob::ecb(clear_text), VdmaJob::NULL];
        self.out_jobs = [VdmaJob::ecb(cipher_text), VdmaJob::NULL];
    }

    /// Sets the transfer size of both job lists.
    pub fn set_job_size(&mut self, size: usize) {
        self.in_jobs[0].set_size(size);
        self.out_jobs[0].set_size(size);
    }
}

impl Default for EcbData {
    fn default() -> Self {
        Self::new()
    }
}

/// Register-level operations of one ECB peripheral.
///
/// Implemented by the nRF52 PAC `ECB` instance (flat generation), by [`Ecb00`] (descriptor
/// generation) and by the software model in [`sim`].
pub trait EcbRegisters {
    fn generation(&self) -> Generation;

    /// Masks the peripheral's interrupts and stops any running operation.
    fn init(&mut self);

    /// Makes the peripheral read from and write to `data`.
    fn point_at(&mut self, data: &mut EcbData);

    /// Loads the key held in the scratch buffer into the peripheral.
    fn load_key(&mut self, key: &[u8; KEY_SIZE]);

    fn set_transfer_size(&mut self, data: &mut EcbData, len: usize);

    fn clear_events(&mut self);

    /// Triggers one operation.
    ///
    /// The peripheral accesses `data` through DMA until [`status`](EcbRegisters::status) stops
    /// reporting [`Status::Busy`]; the borrow keeps the buffers in place for that time.
    fn start(&mut self, data: &mut EcbData);

    fn stop(&mut self);

    fn status(&mut self) -> Status;
}

/// Driver configuration.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Maximum number of completion polls per block; `None` waits forever.
    pub poll_limit: Option<u32>,
    /// Re-install the data pointers before every block because another agent (a radio
    /// controller, for example) also programs the peripheral.
    pub shared: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_limit: Some(DEFAULT_POLL_LIMIT),
            shared: false,
        }
    }
}

struct Inner<R> {
    regs: R,
    data: &'static mut EcbData,
}

impl<R: EcbRegisters> Inner<R> {
    /// Encrypts the block in `data.clear_text` into `data.cipher_text`.
    fn run(&mut self, config: &Config) -> Result<(), Error> {
        if config.shared {
            self.regs.point_at(self.data);
        }

        self.regs.load_key(&self.data.key);
        self.regs.set_transfer_size(self.data, AES_BLOCK_SIZE);
        self.regs.clear_events();

        // "Preceding reads and writes cannot be moved past subsequent writes."
        compiler_fence(Ordering::Release);
        self.regs.start(self.data);

        let mut polls: u32 = 0;
        let status = loop {
            match self.regs.status() {
                Status::Busy => {}
                done => break done,
            }
            if let Some(limit) = config.poll_limit {
                polls += 1;
                if polls >= limit {
                    self.regs.stop();
                    error!("ECB operation timed out after {} polls", polls);
                    return Err(Error::Timeout);
                }
            }
        };

        // "Subsequent reads and writes cannot be moved ahead of preceding reads."
        compiler_fence(Ordering::Acquire);

        if status == Status::Error {
            // The events are cleared before the next operation.
            error!("ECB operation error");
            return Err(Error::HardwareFault);
        }
        trace!("ECB block done");
        Ok(())
    }
}

/// HAL structure interface to use the capabilities of the ECB peripheral
pub struct Ecb<R> {
    inner: UnsafeCell<Inner<R>>,
    in_use: AtomicBool,
    generation: Generation,
    config: Config,
}

// The registers and buffers are only reached through the one `Session` that won `in_use`.
unsafe impl<R: Send> Sync for Ecb<R> {}

impl<R: EcbRegisters> Ecb<R> {
    /// Takes ownership of the peripheral and its DMA memory, with the default [`Config`].
    pub fn new(regs: R, data: &'static mut EcbData) -> Self {
        Self::with_config(regs, data, Config::default())
    }

    pub fn with_config(mut regs: R, data: &'static mut EcbData, config: Config) -> Self {
        regs.init();
        regs.point_at(data);
        let generation = regs.generation();
        debug!("ECB driver ready, {:?} generation", generation);

        Self {
            inner: UnsafeCell::new(Inner { regs, data }),
            in_use: AtomicBool::new(false),
            generation,
            config,
        }
    }

    /// Consumes `self` and returns back the peripheral and its DMA memory.
    pub fn free(self) -> (R, &'static mut EcbData) {
        let inner = self.inner.into_inner();
        (inner.regs, inner.data)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Capabilities of the ECB peripheral: raw keys, separate buffers, synchronous operation.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::RAW_KEY | Capabilities::SEPARATE_IO_BUFS | Capabilities::SYNC_OPS
    }

    /// Opens an encryption session, claiming the peripheral until the session is closed.
    pub fn begin_session(&self, config: &SessionConfig<'_>) -> Result<Session<'_, R>, Error> {
        let supported = config.algo == CipherAlgo::Aes
            && config.mode == CipherMode::Ecb
            && config.op == CipherOp::Encrypt
            && config.key_len == KEY_SIZE
            && config.flags.contains(Capabilities::SYNC_OPS);
        if !supported {
            error!("only 128-bit AES ECB encryption in synchronous mode is supported");
            return Err(Error::UnsupportedConfiguration);
        }

        let key = match config.key {
            Some(key) => key,
            None => {
                error!("no key provided");
                return Err(Error::MissingKey);
            }
        };
        if key.len() != config.key_len {
            error!("key is {} bytes, expected {}", key.len(), config.key_len);
            return Err(Error::UnsupportedConfiguration);
        }

        if self
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            error!("peripheral in use");
            return Err(Error::PeripheralBusy);
        }

        // NOTE(unsafe) `in_use` was just acquired, nothing else touches the inner state.
        let inner = unsafe { &mut *self.inner.get() };
        inner.data.key.copy_from_slice(key);
        debug!("ECB session opened");

        Ok(Session {
            ecb: self,
            mode: config.mode,
            open: true,
        })
    }
}

/// An exclusive claim on the ECB peripheral.
///
/// Dropping the session releases the peripheral.
pub struct Session<'a, R> {
    ecb: &'a Ecb<R>,
    mode: CipherMode,
    open: bool,
}

impl<'a, R: EcbRegisters> Session<'a, R> {
    fn inner(&mut self) -> Result<&mut Inner<R>, Error> {
        if !self.open {
            return Err(Error::SessionClosed);
        }
        // NOTE(unsafe) an open session holds `in_use`, and `&mut self` serializes its callers.
        Ok(unsafe { &mut *self.ecb.inner.get() })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Encrypts the single block in `pkt.input` into `pkt.output`.
    pub fn encrypt_block(&mut self, pkt: &mut CipherPacket<'_>) -> Result<(), Error> {
        let config = self.ecb.config;
        let inner = self.inner()?;

        if pkt.input.len() != AES_BLOCK_SIZE {
            error!("only 16-byte blocks are supported");
            return Err(Error::InvalidBlockSize);
        }
        if pkt.output.len() < pkt.input.len() {
            error!("output buffer too small");
            return Err(Error::OutputTooSmall);
        }

        inner.data.clear_text.copy_from_slice(pkt.input);
        inner.run(&config)?;
        pkt.output[..AES_BLOCK_SIZE].copy_from_slice(&inner.data.cipher_text);
        pkt.out_len = pkt.input.len();
        Ok(())
    }

    /// Encrypts `block`, returning the ciphertext.
    pub fn encrypt(&mut self, block: &[u8; AES_BLOCK_SIZE]) -> Result<[u8; AES_BLOCK_SIZE], Error> {
        let mut out = [0; AES_BLOCK_SIZE];
        self.encrypt_block(&mut CipherPacket::new(block, &mut out))?;
        Ok(out)
    }

    /// Gets a reference to the clear text memory
    ///
    /// This is the data that [`encrypt_staged`](Session::encrypt_staged) encrypts.
    pub fn clear_text(&mut self) -> Result<&mut [u8; AES_BLOCK_SIZE], Error> {
        Ok(&mut self.inner()?.data.clear_text)
    }

    /// Get a reference to the cipher text memory
    ///
    /// Holds the result of the last successful encryption.
    pub fn cipher_text(&mut self) -> Result<&[u8; AES_BLOCK_SIZE], Error> {
        Ok(&self.inner()?.data.cipher_text)
    }

    /// Encrypts the block staged in [`clear_text`](Session::clear_text) without copying it in
    /// or out.
    pub fn encrypt_staged(&mut self) -> Result<&[u8; AES_BLOCK_SIZE], Error> {
        let config = self.ecb.config;
        let inner = self.inner()?;
        inner.run(&config)?;
        Ok(&inner.data.cipher_text)
    }

    /// Releases the peripheral. Closing an already closed session does nothing.
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            self.ecb.in_use.store(false, Ordering::Release);
            debug!("ECB session closed");
        }
    }
}

impl<R> Drop for Session<'_, R> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.ecb.in_use.store(false, Ordering::Release);
        }
    }
}

impl<R: EcbRegisters> CipherDevice for Ecb<R> {
    type Error = Error;
    type Session<'a> = Session<'a, R> where Self: 'a;

    fn query_caps(&self) -> Capabilities {
        self.capabilities()
    }

    fn begin_session<'a>(&'a self, config: &SessionConfig<'_>) -> Result<Session<'a, R>, Error> {
        Ecb::begin_session(self, config)
    }
}

impl<R: EcbRegisters> CipherSession for Session<'_, R> {
    type Error = Error;

    fn mode(&self) -> CipherMode {
        self.mode
    }

    fn block_op(&mut self, pkt: &mut CipherPacket<'_>) -> Result<(), Error> {
        self.encrypt_block(pkt)
    }

    fn close(&mut self) {
        Session::close(self)
    }
}
