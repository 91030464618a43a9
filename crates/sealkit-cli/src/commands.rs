//! Subcommand implementations. Output goes to the supplied writer.

use std::io::Write;

use sealkit_crypto::{CryptoProvider, Environment, KeyMaterial, SecretBox};
use zeroize::Zeroizing;

use crate::{Command, error::CliError};

/// Execute one subcommand against `provider`.
pub(crate) fn run<E: Environment>(
    command: &Command,
    provider: &CryptoProvider<E>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Command::Probe => probe(provider, out),
        Command::Keygen => keygen(&provider.secret_box()?, out),
        Command::Seal { key, aad, message } => {
            seal(&provider.secret_box()?, key, aad.as_deref(), message, out)
        },
        Command::Open { key, aad, sealed } => {
            open(&provider.secret_box()?, key, aad.as_deref(), sealed, out)
        },
    }
}

fn probe<E: Environment>(
    provider: &CryptoProvider<E>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let selected = provider.initialize();

    writeln!(out, "algorithm: {}", provider.config().algorithm)?;
    for probe in provider.capabilities().unwrap_or_default() {
        match probe {
            Ok(capability) => writeln!(
                out,
                "{:<12} available   key={} nonce={} tag={} overhead={}",
                capability.kind,
                capability.key_bytes,
                capability.nonce_bytes,
                capability.tag_bytes,
                capability.aead_bytes()
            )?,
            Err(unavailable) => {
                writeln!(out, "{:<12} unavailable ({})", unavailable.kind, unavailable.reason)?;
            },
        }
    }

    let capability = selected?;
    writeln!(out, "selected: {}", capability.kind)?;
    Ok(())
}

fn keygen<E: Environment>(sbox: &SecretBox<E>, out: &mut impl Write) -> Result<(), CliError> {
    let key = sbox.generate_key()?;
    let encoded = Zeroizing::new(key.with_borrow(|bytes| hex::encode(bytes))?);
    writeln!(out, "{}", encoded.as_str())?;
    Ok(())
}

fn seal<E: Environment>(
    sbox: &SecretBox<E>,
    key: &str,
    aad: Option<&str>,
    message: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let key = decode_key(sbox, key)?;
    let sealed = sbox.seal(message.as_bytes(), &key, aad.map(str::as_bytes))?;
    writeln!(out, "{}", hex::encode(sealed))?;
    Ok(())
}

fn open<E: Environment>(
    sbox: &SecretBox<E>,
    key: &str,
    aad: Option<&str>,
    sealed: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let key = decode_key(sbox, key)?;
    let sealed =
        hex::decode(sealed).map_err(|source| CliError::Hex { field: "sealed box", source })?;

    let plaintext = Zeroizing::new(sbox.open(&sealed, &key, aad.map(str::as_bytes))?);
    out.write_all(&plaintext)?;
    writeln!(out)?;
    Ok(())
}

fn decode_key<E: Environment>(sbox: &SecretBox<E>, key: &str) -> Result<KeyMaterial, CliError> {
    let mut raw =
        Zeroizing::new(hex::decode(key).map_err(|source| CliError::Hex { field: "key", source })?);
    Ok(KeyMaterial::import_and_scrub(&mut raw, sbox.key_bytes())?)
}
