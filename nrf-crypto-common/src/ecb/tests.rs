use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use hex_literal::hex;

use super::sim::{Fault, SimEcb};
use super::*;

const FIPS_KEY: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");
const FIPS_PLAIN: [u8; 16] = hex!("00112233445566778899aabbccddeeff");
const FIPS_CIPHER: [u8; 16] = hex!("69c4e0d86a7b0430d8cdb78070b4c55a");

const SP800_KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
const SP800_BLOCKS: [([u8; 16], [u8; 16]); 4] = [
    (
        hex!("6bc1bee22e409f96e93d7e117393172a"),
        hex!("3ad77bb40d7a3660a89ecaf32466ef97"),
    ),
    (
        hex!("ae2d8a571e03ac9c9eb76fac45af8e51"),
        hex!("f5d3d58503b9699de785895a96fdbaaf"),
    ),
    (
        hex!("30c81c46a35ce411e5fbc1191a0a52ef"),
        hex!("43b1cd7f598ece23881b00e3ed030688"),
    ),
    (
        hex!("f69f2445df4f9b17ad2b417be66c3710"),
        hex!("7b0c785e27e8ad3f8223207104725dd4"),
    ),
];

const MSG: [u8; 16] = *b"Message to encry";
const KEY: [u8; 16] = *b"aaaaaaaaaaaaaaaa";
const CIPHER_MSG: [u8; 16] = [
    0xFE, 0xF1, 0x63, 0x82, 0xB4, 0x54, 0x6B, 0xE4, 0xEB, 0x9A, 0x5C, 0x0E, 0xB6, 0x0E, 0x49, 0x2F,
];

fn data() -> &'static mut EcbData {
    Box::leak(Box::new(EcbData::new()))
}

fn both_generations() -> [SimEcb; 2] {
    [SimEcb::flat(), SimEcb::descriptor()]
}

fn reference(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut out = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut out);
    out.into()
}

#[test]
fn capabilities() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let caps = ecb.capabilities();
    assert_eq!(
        caps,
        Capabilities::RAW_KEY | Capabilities::SEPARATE_IO_BUFS | Capabilities::SYNC_OPS
    );
    assert_eq!(caps.bits(), 0b11_0010);
    assert!(!caps.contains(Capabilities::ASYNC_OPS));
    assert_eq!(ecb.query_caps(), caps);
}

#[test]
fn known_vectors() {
    for hw in both_generations() {
        let ecb = Ecb::new(hw, data());

        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
            .unwrap();
        assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
        session.close();

        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&SP800_KEY))
            .unwrap();
        for (plain, cipher) in SP800_BLOCKS.iter() {
            assert_eq!(&session.encrypt(plain).unwrap(), cipher);
        }
        session.close();

        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&KEY))
            .unwrap();
        assert_eq!(session.encrypt(&MSG).unwrap(), CIPHER_MSG);
    }
}

#[test]
fn matches_reference_cipher() {
    for hw in both_generations() {
        let generation = hw.generation();
        let ecb = Ecb::new(hw, data());

        for seed in 0..8u8 {
            let key: [u8; 16] = core::array::from_fn(|i| seed.wrapping_mul(31) ^ i as u8);
            let block: [u8; 16] = core::array::from_fn(|i| seed.wrapping_add(i as u8 * 7));

            let mut session = ecb
                .begin_session(&SessionConfig::aes128_ecb_encrypt(&key))
                .unwrap();
            let mut out = [0; 16];
            let mut pkt = CipherPacket::new(&block, &mut out);
            session.encrypt_block(&mut pkt).unwrap();
            assert_eq!(pkt.out_len, 16);
            assert_eq!(out, reference(&key, &block), "{:?} seed {}", generation, seed);
        }
    }
}

#[test]
fn second_session_is_busy() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);

    let mut first = ecb.begin_session(&config).unwrap();
    assert_eq!(ecb.begin_session(&config).err(), Some(Error::PeripheralBusy));

    first.close();
    let mut second = ecb.begin_session(&config).unwrap();
    assert_eq!(second.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn busy_session_keeps_its_key() {
    let ecb = Ecb::new(SimEcb::descriptor(), data());

    let mut first = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    assert!(ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&SP800_KEY))
        .is_err());
    assert_eq!(first.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn drop_releases_peripheral() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);

    {
        let _session = ecb.begin_session(&config).unwrap();
    }
    assert!(ecb.begin_session(&config).is_ok());
}

#[test]
fn invalid_block_size() {
    for hw in both_generations() {
        let ecb = Ecb::new(&hw, data());
        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
            .unwrap();

        for len in [0, 15, 17, 32] {
            let input = vec![0xa5u8; len];
            let mut out = [0; 64];
            let mut pkt = CipherPacket::new(&input, &mut out);
            assert_eq!(session.encrypt_block(&mut pkt), Err(Error::InvalidBlockSize));
            assert_eq!(pkt.out_len, 0);
        }
        assert_eq!(hw.starts(), 0);
    }
}

#[test]
fn output_too_small() {
    let hw = SimEcb::flat();
    let ecb = Ecb::new(&hw, data());
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();

    let mut out = [0; 15];
    let mut pkt = CipherPacket::new(&FIPS_PLAIN, &mut out);
    assert_eq!(session.encrypt_block(&mut pkt), Err(Error::OutputTooSmall));
    assert_eq!(hw.starts(), 0);

    let mut out = [0; 20];
    let mut pkt = CipherPacket::new(&FIPS_PLAIN, &mut out);
    session.encrypt_block(&mut pkt).unwrap();
    assert_eq!(pkt.out_len, 16);
    assert_eq!(out[..16], FIPS_CIPHER);
    assert_eq!(out[16..], [0; 4]);
}

#[test]
fn unsupported_configurations() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let key24 = [0x11u8; 24];
    let key32 = [0x22u8; 32];

    let mut configs = vec![
        SessionConfig::aes128_ecb_encrypt(&key24),
        SessionConfig::aes128_ecb_encrypt(&key32),
    ];

    let mut decrypt = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
    decrypt.op = CipherOp::Decrypt;
    configs.push(decrypt);

    for mode in [CipherMode::Cbc, CipherMode::Ctr, CipherMode::Ccm, CipherMode::Gcm] {
        let mut config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
        config.mode = mode;
        configs.push(config);
    }

    let mut asynchronous = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
    asynchronous.flags = Capabilities::RAW_KEY | Capabilities::ASYNC_OPS;
    configs.push(asynchronous);

    let mut short_key = SessionConfig::aes128_ecb_encrypt(&key24[..8]);
    short_key.key_len = 16;
    configs.push(short_key);

    for config in configs.iter() {
        assert_eq!(
            ecb.begin_session(config).err(),
            Some(Error::UnsupportedConfiguration),
            "{:?}",
            config
        );
    }

    // None of the rejected requests claimed the peripheral.
    assert!(ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .is_ok());
}

#[test]
fn missing_key() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let mut config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
    config.key = None;
    assert_eq!(ecb.begin_session(&config).err(), Some(Error::MissingKey));
}

#[test]
fn validation_order() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let _held = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();

    let mut keyless = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
    keyless.key = None;
    assert_eq!(ecb.begin_session(&keyless).err(), Some(Error::MissingKey));

    keyless.op = CipherOp::Decrypt;
    assert_eq!(
        ecb.begin_session(&keyless).err(),
        Some(Error::UnsupportedConfiguration)
    );
}

#[test]
fn close_is_idempotent() {
    let ecb = Ecb::new(SimEcb::descriptor(), data());
    let config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);

    let mut session = ecb.begin_session(&config).unwrap();
    session.close();
    session.close();
    assert!(!session.is_open());

    let mut other = ecb.begin_session(&config).unwrap();
    // Closing the stale handle again must not release the new claim.
    session.close();
    drop(session);
    assert_eq!(ecb.begin_session(&config).err(), Some(Error::PeripheralBusy));
    assert_eq!(other.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn closed_session_is_unusable() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    session.close();

    assert_eq!(session.encrypt(&FIPS_PLAIN), Err(Error::SessionClosed));
    assert_eq!(session.encrypt_staged().err(), Some(Error::SessionClosed));
    assert!(session.clear_text().is_err());
    assert!(session.cipher_text().is_err());
}

#[test]
fn staged_block_matches_caller_buffers() {
    for hw in both_generations() {
        let ecb = Ecb::new(hw, data());
        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&SP800_KEY))
            .unwrap();

        let (plain, cipher) = SP800_BLOCKS[1];
        let buffered = session.encrypt(&plain).unwrap();

        session.clear_text().unwrap().copy_from_slice(&plain);
        let staged = *session.encrypt_staged().unwrap();

        assert_eq!(staged, buffered);
        assert_eq!(staged, cipher);
        assert_eq!(session.cipher_text().unwrap(), &cipher);
    }
}

#[test]
fn hardware_fault_keeps_session() {
    for hw in both_generations() {
        let ecb = Ecb::new(&hw, data());
        let config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);
        let mut session = ecb.begin_session(&config).unwrap();

        hw.inject(Fault::Error);
        let mut out = [0; 16];
        let mut pkt = CipherPacket::new(&FIPS_PLAIN, &mut out);
        assert_eq!(session.encrypt_block(&mut pkt), Err(Error::HardwareFault));
        assert_eq!(pkt.out_len, 0);
        assert_eq!(out, [0; 16]);

        assert_eq!(ecb.begin_session(&config).err(), Some(Error::PeripheralBusy));

        // The events are cleared before the next operation.
        assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
    }
}

#[test]
fn stalled_peripheral_times_out() {
    let hw = SimEcb::descriptor();
    let config = Config {
        poll_limit: Some(50),
        ..Config::default()
    };
    let ecb = Ecb::with_config(&hw, data(), config);
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    let stops = hw.stops();

    hw.inject(Fault::Stall);
    assert_eq!(session.encrypt(&FIPS_PLAIN), Err(Error::Timeout));
    assert_eq!(hw.stops(), stops + 1);
    assert!(session.is_open());

    assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn slow_peripheral_within_limit() {
    let hw = SimEcb::flat().with_latency(40);
    let config = Config {
        poll_limit: Some(50),
        ..Config::default()
    };
    let ecb = Ecb::with_config(&hw, data(), config);
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);

    let unbounded = Ecb::with_config(
        SimEcb::flat().with_latency(DEFAULT_POLL_LIMIT + 10),
        data(),
        Config {
            poll_limit: None,
            ..Config::default()
        },
    );
    let mut session = unbounded
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn descriptor_key_is_reversed() {
    let hw = SimEcb::descriptor();
    let ecb = Ecb::new(&hw, data());
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    session.encrypt(&FIPS_PLAIN).unwrap();

    assert_eq!(
        hw.key_registers(),
        [0x0c0d_0e0f, 0x0809_0a0b, 0x0405_0607, 0x0001_0203]
    );

    // Repeated blocks keep loading the same key.
    assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
    assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
}

#[test]
fn descriptor_jobs() {
    let ecb = Ecb::new(SimEcb::descriptor(), data());
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
        .unwrap();
    session.encrypt(&FIPS_PLAIN).unwrap();
    drop(session);

    let (_, data) = ecb.free();
    let [job, end] = *data.in_jobs();
    assert_eq!(job.ptr(), data.clear_text().as_ptr() as u32);
    assert_eq!(job.size(), 16);
    assert_eq!(job.attributes(), vdma::ATTRIBUTE_ECB);
    assert_eq!(end, VdmaJob::NULL);

    let [job, end] = *data.out_jobs();
    assert_eq!(job.ptr(), data.cipher_text_mut().as_ptr() as u32);
    assert_eq!(job.size(), 16);
    assert_eq!(end, VdmaJob::NULL);
}

#[test]
fn job_size_is_24_bits() {
    let mut job = VdmaJob::ecb(0x2000_0000);
    job.set_size(0x0100_0010);
    assert_eq!(job.size(), 0x10);
    assert_eq!(job.attributes(), vdma::ATTRIBUTE_ECB);
    assert_eq!(job.ptr(), 0x2000_0000);
}

#[test]
fn shared_mode_reinstalls_pointers() {
    for hw in both_generations() {
        let ecb = Ecb::new(&hw, data());
        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
            .unwrap();
        hw.clobber_pointers();
        assert_eq!(session.encrypt(&FIPS_PLAIN), Err(Error::HardwareFault));
    }

    for hw in both_generations() {
        let config = Config {
            shared: true,
            ..Config::default()
        };
        let ecb = Ecb::with_config(&hw, data(), config);
        let mut session = ecb
            .begin_session(&SessionConfig::aes128_ecb_encrypt(&FIPS_KEY))
            .unwrap();
        hw.clobber_pointers();
        assert_eq!(session.encrypt(&FIPS_PLAIN).unwrap(), FIPS_CIPHER);
    }
}

#[test]
fn init_quiesces_peripheral() {
    let hw = SimEcb::flat();
    assert!(hw.interrupts_enabled());

    let ecb = Ecb::new(&hw, data());
    assert!(!hw.interrupts_enabled());
    assert_eq!(hw.stops(), 1);
    assert_eq!(hw.starts(), 0);
    assert_eq!(ecb.generation(), Generation::Flat);
}

#[test]
fn free_returns_parts() {
    let ecb = Ecb::new(SimEcb::descriptor(), data());
    let mut session = ecb
        .begin_session(&SessionConfig::aes128_ecb_encrypt(&KEY))
        .unwrap();
    session.encrypt(&MSG).unwrap();
    drop(session);

    let (hw, data) = ecb.free();
    assert_eq!(hw.starts(), 1);
    assert_eq!(data.key(), &KEY);
    assert_eq!(data.clear_text(), &MSG);
}

#[test]
fn sessions_across_threads() {
    let ecb = Ecb::new(SimEcb::flat(), data());
    let config = SessionConfig::aes128_ecb_encrypt(&FIPS_KEY);

    let mut held = ecb.begin_session(&config).unwrap();
    std::thread::scope(|s| {
        let busy = s.spawn(|| ecb.begin_session(&config).err()).join().unwrap();
        assert_eq!(busy, Some(Error::PeripheralBusy));
    });
    held.close();

    std::thread::scope(|s| {
        let cipher = s
            .spawn(|| {
                let mut session = ecb.begin_session(&config)?;
                session.encrypt(&FIPS_PLAIN)
            })
            .join()
            .unwrap();
        assert_eq!(cipher, Ok(FIPS_CIPHER));
    });
}

fn encrypt_with<D: CipherDevice>(
    device: &D,
    key: &[u8],
    block: &[u8; 16],
) -> Result<[u8; 16], D::Error> {
    let mut session = device.begin_session(&SessionConfig::aes128_ecb_encrypt(key))?;
    assert_eq!(session.mode(), CipherMode::Ecb);

    let mut out = [0; 16];
    let mut pkt = CipherPacket::new(block, &mut out);
    session.block_op(&mut pkt)?;
    session.close();
    Ok(out)
}

#[test]
fn generic_cipher_client() {
    let ecb = Ecb::new(SimEcb::descriptor(), data());
    assert_eq!(encrypt_with(&ecb, &KEY, &MSG), Ok(CIPHER_MSG));
    assert_eq!(encrypt_with(&ecb, &KEY, &MSG), Ok(CIPHER_MSG));
    assert_eq!(
        encrypt_with(&ecb, &[0u8; 32], &MSG),
        Err(Error::UnsupportedConfiguration)
    );
}

#[test]
fn error_messages() {
    assert_eq!(
        Error::InvalidBlockSize.to_string(),
        "only 16-byte blocks are supported"
    );
    assert_eq!(Error::PeripheralBusy.to_string(), "peripheral in use");
    assert_eq!(Error::HardwareFault.to_string(), "ECB operation error");
}
