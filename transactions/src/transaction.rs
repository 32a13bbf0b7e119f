//! Regular (non-coinbase) transactions.

use crate::codec::{decode_hex, Reader};
use crate::error::{DecodeError, TransactionError};
use denaro_crypto::{decode_address, derive_address, hash_transaction, sha256, sign_message, verify_signature};
use denaro_types::{Address, Amount, KeyPair, OutPoint, PublicKey, Signature, TxHash};
use std::collections::{HashMap, HashSet};

pub const TX_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    pub outpoint: OutPoint,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl TransactionInput {
    /// An input awaiting `Transaction::sign`.
    pub fn unsigned(outpoint: OutPoint, public_key: PublicKey) -> Self {
        Self {
            outpoint,
            public_key,
            signature: Signature([0u8; 64]),
        }
    }

    /// Address allowed to spend the referenced output.
    pub fn address(&self) -> Address {
        derive_address(&self.public_key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    pub recipient: PublicKey,
    pub amount: Amount,
}

impl TransactionOutput {
    pub fn new(recipient: PublicKey, amount: Amount) -> Self {
        Self { recipient, amount }
    }

    pub fn to_address(address: &Address, amount: Amount) -> Result<Self, TransactionError> {
        let recipient = decode_address(address)
            .map_err(|_| TransactionError::InvalidAddress(address.to_string()))?;
        Ok(Self { recipient, amount })
    }

    pub fn address(&self) -> Address {
        derive_address(&self.recipient)
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.recipient.as_bytes());
        out.extend_from_slice(&self.amount.raw().to_le_bytes());
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            recipient: PublicKey(r.array()?),
            amount: Amount::new(r.u64()?),
        })
    }
}

/// A transfer spending committed outputs.
///
/// Wire layout, integers little-endian:
/// `version | n_in | n_in × (tx_hash | index | public_key | signature) | n_out |
/// n_out × (public_key | amount) | has_message [| len:u16 | message]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u8,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub message: Option<Vec<u8>>,
}

impl Transaction {
    pub fn new(
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        message: Option<Vec<u8>>,
    ) -> Result<Self, TransactionError> {
        if inputs.len() > u8::MAX as usize {
            return Err(TransactionError::TooManyInputs(inputs.len()));
        }
        if outputs.len() > u8::MAX as usize {
            return Err(TransactionError::TooManyOutputs(outputs.len()));
        }
        if let Some(m) = &message {
            if m.len() > u16::MAX as usize {
                return Err(TransactionError::MessageTooLong(m.len()));
            }
        }
        Ok(Self {
            version: TX_VERSION,
            inputs,
            outputs,
            message,
        })
    }

    fn write(&self, out: &mut Vec<u8>, with_witness: bool) {
        out.push(self.version);
        out.push(self.inputs.len() as u8);
        for input in &self.inputs {
            out.extend_from_slice(input.outpoint.tx_hash.as_bytes());
            out.push(input.outpoint.index);
            if with_witness {
                out.extend_from_slice(input.public_key.as_bytes());
                out.extend_from_slice(input.signature.as_bytes());
            }
        }
        out.push(self.outputs.len() as u8);
        for output in &self.outputs {
            output.write(out);
        }
        match &self.message {
            Some(m) => {
                out.push(1);
                out.extend_from_slice(&(m.len() as u16).to_le_bytes());
                out.extend_from_slice(m);
            }
            None => out.push(0),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.inputs.len() * 129 + self.outputs.len() * 40);
        self.write(&mut out, true);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Bytes covered by the input signatures: everything except keys and signatures.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out, false);
        out
    }

    pub fn signing_digest(&self) -> [u8; 32] {
        sha256(&self.signing_bytes())
    }

    pub fn hash(&self) -> TxHash {
        hash_transaction(&self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let tx = Self::read(&mut r)?;
        r.finish()?;
        Ok(tx)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        Self::from_bytes(&decode_hex(s)?)
    }

    /// Body after the version byte. The caller has already seen a non-zero input count.
    pub(crate) fn read_body(version: u8, n_inputs: u8, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let mut inputs = Vec::with_capacity(n_inputs as usize);
        for _ in 0..n_inputs {
            let tx_hash = TxHash::new(r.array()?);
            let index = r.u8()?;
            inputs.push(TransactionInput {
                outpoint: OutPoint::new(tx_hash, index),
                public_key: PublicKey(r.array()?),
                signature: Signature(r.array()?),
            });
        }
        let n_outputs = r.u8()?;
        let mut outputs = Vec::with_capacity(n_outputs as usize);
        for _ in 0..n_outputs {
            outputs.push(TransactionOutput::read(r)?);
        }
        let message = match r.u8()? {
            0 => None,
            1 => {
                let len = r.u16()? as usize;
                Some(r.take(len)?.to_vec())
            }
            flag => return Err(DecodeError::InvalidFlag(flag)),
        };
        Ok(Self {
            version,
            inputs,
            outputs,
            message,
        })
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = r.u8()?;
        if version != TX_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let n_inputs = r.u8()?;
        Self::read_body(version, n_inputs, r)
    }

    /// Sign every input. One signature is produced per distinct key and
    /// shared by all inputs carrying that key.
    pub fn sign(&mut self, keys: &[KeyPair]) -> Result<(), TransactionError> {
        let digest = self.signing_digest();
        let mut by_key: HashMap<PublicKey, Signature> = HashMap::new();
        for (index, input) in self.inputs.iter_mut().enumerate() {
            if let Some(sig) = by_key.get(&input.public_key) {
                input.signature = *sig;
                continue;
            }
            let pair = keys
                .iter()
                .find(|k| k.public == input.public_key)
                .ok_or_else(|| TransactionError::MissingKey {
                    index,
                    public_key: hex::encode(input.public_key.as_bytes()),
                })?;
            let sig = sign_message(&digest, &pair.private);
            by_key.insert(input.public_key, sig);
            input.signature = sig;
        }
        Ok(())
    }

    /// Verify each distinct `(key, signature)` pair once against the signing digest.
    pub fn verify_signatures(&self) -> bool {
        let digest = self.signing_digest();
        let mut checked: HashSet<(PublicKey, [u8; 64])> = HashSet::new();
        self.inputs.iter().all(|input| {
            if !checked.insert((input.public_key, input.signature.0)) {
                return true;
            }
            verify_signature(&digest, &input.signature, &input.public_key)
        })
    }

    /// `None` on overflow.
    pub fn output_total(&self) -> Option<Amount> {
        Amount::checked_sum(self.outputs.iter().map(|o| o.amount))
    }

    pub fn message_len(&self) -> usize {
        self.message.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denaro_crypto::keypair_from_seed;

    fn outpoint(n: u8) -> OutPoint {
        OutPoint::new(TxHash::new([n; 32]), n)
    }

    fn signed_tx(keys: &[KeyPair]) -> Transaction {
        let inputs = keys
            .iter()
            .enumerate()
            .map(|(i, k)| TransactionInput::unsigned(outpoint(i as u8), k.public))
            .collect();
        let outputs = vec![TransactionOutput::new(keys[0].public, Amount::from_coins(1))];
        let mut tx = Transaction::new(inputs, outputs, Some(b"hi".to_vec())).unwrap();
        tx.sign(keys).unwrap();
        tx
    }

    #[test]
    fn wire_roundtrip_preserves_hash() {
        let tx = signed_tx(&[keypair_from_seed(&[1; 32]), keypair_from_seed(&[2; 32])]);
        let decoded = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn wire_layout_sizes() {
        let tx = signed_tx(&[keypair_from_seed(&[1; 32])]);
        // version, n_in, 129 per input, n_out, 40 per output, flag, len, "hi"
        assert_eq!(tx.to_bytes().len(), 1 + 1 + 129 + 1 + 40 + 1 + 2 + 2);
    }

    #[test]
    fn signatures_verify_and_detect_tampering() {
        let mut tx = signed_tx(&[keypair_from_seed(&[1; 32])]);
        assert!(tx.verify_signatures());
        tx.outputs[0].amount = Amount::from_coins(2);
        assert!(!tx.verify_signatures());
    }

    #[test]
    fn shared_key_signs_once() {
        let k = keypair_from_seed(&[3; 32]);
        let inputs = vec![
            TransactionInput::unsigned(outpoint(1), k.public),
            TransactionInput::unsigned(outpoint(2), k.public),
        ];
        let mut tx = Transaction::new(
            inputs,
            vec![TransactionOutput::new(k.public, Amount::new(5))],
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&k)).unwrap();
        assert_eq!(tx.inputs[0].signature, tx.inputs[1].signature);
        assert!(tx.verify_signatures());
    }

    #[test]
    fn differing_signature_on_shared_key_is_checked() {
        let k = keypair_from_seed(&[3; 32]);
        let mut tx = signed_tx(&[k]);
        let extra = tx.inputs[0].clone();
        tx.inputs.push(TransactionInput {
            outpoint: outpoint(9),
            signature: Signature([1u8; 64]),
            ..extra
        });
        assert!(!tx.verify_signatures());
    }

    #[test]
    fn signing_without_key_fails() {
        let k = keypair_from_seed(&[4; 32]);
        let other = keypair_from_seed(&[5; 32]);
        let mut tx = Transaction::new(
            vec![TransactionInput::unsigned(outpoint(1), k.public)],
            vec![TransactionOutput::new(k.public, Amount::new(1))],
            None,
        )
        .unwrap();
        assert!(matches!(
            tx.sign(&[other]),
            Err(TransactionError::MissingKey { index: 0, .. })
        ));
    }

    #[test]
    fn decode_rejects_bad_input() {
        let tx = signed_tx(&[keypair_from_seed(&[1; 32])]);
        let mut bytes = tx.to_bytes();
        bytes.push(0);
        assert_eq!(Transaction::from_bytes(&bytes), Err(DecodeError::TrailingBytes(1)));
        let bytes = tx.to_bytes();
        assert!(matches!(
            Transaction::from_bytes(&bytes[..bytes.len() - 1]),
            Err(DecodeError::Truncated { .. })
        ));
        let mut bytes = tx.to_bytes();
        bytes[0] = 9;
        assert_eq!(Transaction::from_bytes(&bytes), Err(DecodeError::UnsupportedVersion(9)));
        assert!(matches!(Transaction::from_hex("zz"), Err(DecodeError::Hex(_))));
    }

    #[test]
    fn output_address_roundtrip() {
        let k = keypair_from_seed(&[6; 32]);
        let addr = derive_address(&k.public);
        let out = TransactionOutput::to_address(&addr, Amount::new(1)).unwrap();
        assert_eq!(out.address(), addr);
    }
}
