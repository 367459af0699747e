//! Generic block cipher session interface.
//!
//! Cipher clients are written against [`CipherDevice`] and [`CipherSession`] and never see the
//! register layout of the peripheral doing the work.

use bitflags::bitflags;

/// Size of one AES block in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

bitflags! {
    /// Capability flags of a cipher device.
    ///
    /// Bit positions are fixed so the flags can cross an FFI or logging boundary as a plain
    /// integer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// Keys are referenced through an opaque handle.
        const OPAQUE_KEY_HANDLE = 1 << 0;
        /// Keys are passed as raw bytes.
        const RAW_KEY = 1 << 1;
        /// Keys are installed through a dedicated key loading API.
        const KEY_LOADING_API = 1 << 2;
        /// Input and output may be the same buffer.
        const INPLACE_OPS = 1 << 3;
        /// Input and output are separate buffers.
        const SEPARATE_IO_BUFS = 1 << 4;
        /// Operations complete before the call returns.
        const SYNC_OPS = 1 << 5;
        /// Operations complete through a callback.
        const ASYNC_OPS = 1 << 6;
        /// The device generates nonces itself.
        const AUTONONCE = 1 << 7;
        /// The IV is not prefixed to the ciphertext.
        const NO_IV_PREFIX = 1 << 8;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Capabilities {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Capabilities({=u16:#x})", self.bits())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CipherAlgo {
    Aes,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CipherMode {
    Ecb,
    Cbc,
    Ctr,
    Ccm,
    Gcm,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CipherOp {
    Encrypt,
    Decrypt,
}

/// Parameters of a session-open request.
#[derive(Debug, Copy, Clone)]
pub struct SessionConfig<'k> {
    pub algo: CipherAlgo,
    pub mode: CipherMode,
    pub op: CipherOp,
    /// Requested key length in bytes.
    pub key_len: usize,
    /// Raw key material. `None` is rejected when the session is opened.
    pub key: Option<&'k [u8]>,
    /// Invocation mode the caller wants to use, a subset of the device [`Capabilities`].
    pub flags: Capabilities,
}

impl<'k> SessionConfig<'k> {
    /// AES-128 ECB encryption with `key`, synchronous, separate buffers.
    pub fn aes128_ecb_encrypt(key: &'k [u8]) -> Self {
        Self {
            algo: CipherAlgo::Aes,
            mode: CipherMode::Ecb,
            op: CipherOp::Encrypt,
            key_len: key.len(),
            key: Some(key),
            flags: Capabilities::RAW_KEY
                | Capabilities::SEPARATE_IO_BUFS
                | Capabilities::SYNC_OPS,
        }
    }
}

/// One block operation request.
///
/// The output capacity is the length of `output`. On success `out_len` holds the number of
/// bytes written to `output`.
pub struct CipherPacket<'a> {
    pub input: &'a [u8],
    pub output: &'a mut [u8],
    pub out_len: usize,
}

impl<'a> CipherPacket<'a> {
    pub fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            input,
            output,
            out_len: 0,
        }
    }
}

/// A device that can open cipher sessions.
pub trait CipherDevice {
    type Error;
    type Session<'a>: CipherSession<Error = Self::Error>
    where
        Self: 'a;

    /// Capabilities supported by the device. Never fails.
    fn query_caps(&self) -> Capabilities;

    /// Opens a session, claiming the device until the session is closed or dropped.
    fn begin_session<'a>(
        &'a self,
        config: &SessionConfig<'_>,
    ) -> Result<Self::Session<'a>, Self::Error>;
}

/// An open cipher session.
pub trait CipherSession {
    type Error;

    /// Mode the session was opened with.
    fn mode(&self) -> CipherMode;

    /// Runs one block operation.
    fn block_op(&mut self, pkt: &mut CipherPacket<'_>) -> Result<(), Self::Error>;

    /// Releases the device. Calling it more than once has no further effect.
    fn close(&mut self);
}
