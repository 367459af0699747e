#![no_std]
#![no_main]

// Import the right driver crate, depending on the target chip
#[cfg(feature = "52840")]
pub use nrf52840_crypto as crypto;
#[cfg(feature = "54l15")]
pub use nrf54l15_crypto as crypto;

use {
    core::{
        panic::PanicInfo,
        sync::atomic::{compiler_fence, Ordering},
    },
    cortex_m_rt::entry,
    crypto::{ecb::EcbData, CipherPacket, Ecb, SessionConfig},
    rtt_target::{rprint, rprintln, rtt_init_print},
};

const MSG: [u8; 16] = *b"Message to encry";
const KEY: [u8; 16] = *b"aaaaaaaaaaaaaaaa";
const CIPHER_MSG: [u8; 16] = [
    0xFE, 0xF1, 0x63, 0x82, 0xB4, 0x54, 0x6B, 0xE4, 0xEB, 0x9A, 0x5C, 0x0E, 0xB6, 0x0E, 0x49, 0x2F,
];

#[cfg(feature = "52840")]
fn ecb(data: &'static mut EcbData) -> Ecb {
    let p = crypto::pac::Peripherals::take().unwrap();
    Ecb::new(p.ECB, data)
}

#[cfg(feature = "54l15")]
fn ecb(data: &'static mut EcbData) -> Ecb {
    unsafe { crypto::take(data) }
}

#[entry]
fn main() -> ! {
    rtt_init_print!();

    let data = cortex_m::singleton!(: EcbData = EcbData::new()).unwrap();
    let ecb = ecb(data);
    rprintln!("Capabilities: {:?}", ecb.capabilities());

    loop {
        rprintln!("Starting Encryption\n");
        rprintln!("Clear text: {}", core::str::from_utf8(&MSG[..]).unwrap());

        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&KEY))
            .unwrap();
        let mut cipher_text = [0; 16];
        let mut pkt = CipherPacket::new(&MSG, &mut cipher_text);
        session.encrypt_block(&mut pkt).unwrap();
        session.close();

        rprint!("Cipher Text: ");
        for number in cipher_text.iter() {
            rprint!("{:x} ", *number);
        }
        assert_eq!(cipher_text, CIPHER_MSG);
        rprintln!("\r\n Encryption Done\n");

        cortex_m::asm::delay(136_000_000);
    }
}

#[inline(never)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    rprintln!("{}", info);
    loop {
        compiler_fence(Ordering::SeqCst);
    }
}
