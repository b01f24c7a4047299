//! Cryptographic operations for SCP03
//!
//! AES-128 only. The MAC is AES-CMAC (NIST SP 800-38B) and session keys come
//! from the SP 800-108 KDF in counter mode with CMAC as the PRF, laid out as
//! GlobalPlatform Amendment D requires.

use aes::Aes128;
use bytes::Bytes;
use cipher::block_padding::Iso7816;
use cipher::generic_array::GenericArray;
use cipher::{Block, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use cmac::{Cmac, Mac};

use crate::constants::scp03::BLOCK_LENGTH;

/// AES-128 key
pub type AesKey = [u8; BLOCK_LENGTH];

/// AES-CBC encryptor
type Encryptor = cbc::Encryptor<Aes128>;
/// AES-CBC decryptor
type Decryptor = cbc::Decryptor<Aes128>;
/// AES-CMAC
type Cmac128 = Cmac<Aes128>;

/// Encrypt a single block with AES-128
pub fn encrypt_block(key: &AesKey, block: &[u8; BLOCK_LENGTH]) -> [u8; BLOCK_LENGTH] {
    let block_cipher = Aes128::new(GenericArray::from_slice(key));
    let mut buffer = Block::<Aes128>::clone_from_slice(block);
    block_cipher.encrypt_block(&mut buffer);

    let mut output = [0u8; BLOCK_LENGTH];
    output.copy_from_slice(&buffer);
    output
}

fn keyed_mac(key: &AesKey) -> Cmac128 {
    <Cmac128 as KeyInit>::new(GenericArray::from_slice(key))
}

/// Compute the full 16 byte AES-CMAC of `message`
pub fn cmac(key: &AesKey, message: &[u8]) -> [u8; BLOCK_LENGTH] {
    let mut mac = keyed_mac(key);
    mac.update(message);

    let mut output = [0u8; BLOCK_LENGTH];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Check `tag` against the leftmost bytes of the AES-CMAC of `message`
///
/// The comparison runs in constant time. An empty tag never verifies.
pub fn verify_mac(key: &AesKey, message: &[u8], tag: &[u8]) -> bool {
    let mut mac = keyed_mac(key);
    mac.update(message);
    mac.verify_truncated_left(tag).is_ok()
}

// One PRF invocation of the KDF: label, separator, L, counter, then context
fn kdf_block(key: &AesKey, constant: u8, bits: u16, index: u8, context: &[u8]) -> Cmac128 {
    let mut mac = keyed_mac(key);
    mac.update(&[0u8; 11]);
    mac.update(&[constant, 0x00]);
    mac.update(&bits.to_be_bytes());
    mac.update(&[index]);
    mac.update(context);
    mac
}

/// SCP03 key derivation function
///
/// Fills `output` with key material for the given derivation constant.
/// The context is the host challenge followed by the card challenge.
pub fn derive(key: &AesKey, constant: u8, context: &[u8], output: &mut [u8]) {
    let bits = (output.len() * 8) as u16;

    for (index, chunk) in output.chunks_mut(BLOCK_LENGTH).enumerate() {
        let block = kdf_block(key, constant, bits, index as u8 + 1, context)
            .finalize()
            .into_bytes();
        chunk.copy_from_slice(&block[..chunk.len()]);
    }
}

/// Derive a 16 byte session key
pub fn derive_key(key: &AesKey, constant: u8, context: &[u8]) -> AesKey {
    let mut output = [0u8; BLOCK_LENGTH];
    derive(key, constant, context, &mut output);
    output
}

/// Derive an 8 byte cryptogram
pub fn derive_cryptogram(key: &AesKey, constant: u8, context: &[u8]) -> [u8; 8] {
    let mut output = [0u8; 8];
    derive(key, constant, context, &mut output);
    output
}

/// Check a cryptogram received from the card, in constant time
pub fn verify_cryptogram(key: &AesKey, constant: u8, context: &[u8], cryptogram: &[u8]) -> bool {
    cryptogram.len() <= BLOCK_LENGTH
        && kdf_block(key, constant, (cryptogram.len() * 8) as u16, 1, context)
            .verify_truncated_left(cryptogram)
            .is_ok()
}

/// ICV for command data encryption: the encrypted counter block
pub fn command_icv(enc_key: &AesKey, counter: u64) -> [u8; BLOCK_LENGTH] {
    let mut block = [0u8; BLOCK_LENGTH];
    block[8..].copy_from_slice(&counter.to_be_bytes());
    encrypt_block(enc_key, &block)
}

/// ICV for response data decryption: the counter block with its top bit set
pub fn response_icv(enc_key: &AesKey, counter: u64) -> [u8; BLOCK_LENGTH] {
    let mut block = [0u8; BLOCK_LENGTH];
    block[0] = 0x80;
    block[8..].copy_from_slice(&counter.to_be_bytes());
    encrypt_block(enc_key, &block)
}

/// AES-CBC encrypt with ISO/IEC 9797-1 method 2 padding
pub fn encrypt_cbc(key: &AesKey, iv: &[u8; BLOCK_LENGTH], data: &[u8]) -> Bytes {
    Encryptor::new(GenericArray::from_slice(key), GenericArray::from_slice(iv))
        .encrypt_padded_vec_mut::<Iso7816>(data)
        .into()
}

/// AES-CBC decrypt and strip ISO/IEC 9797-1 method 2 padding
///
/// Returns `None` when the data is not block aligned or the padding is invalid.
pub fn decrypt_cbc(key: &AesKey, iv: &[u8; BLOCK_LENGTH], data: &[u8]) -> Option<Bytes> {
    Decryptor::new(GenericArray::from_slice(key), GenericArray::from_slice(iv))
        .decrypt_padded_vec_mut::<Iso7816>(data)
        .ok()
        .map(Bytes::from)
}
