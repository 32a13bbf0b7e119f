//! LMDB implementation of UtxoStore.

use denaro_store::{StoreError, UnspentOutput, UtxoStore};
use denaro_types::{Address, OutPoint};

use crate::environment::{get_record, LmdbLedger};
use crate::{keys, LmdbError};

impl UtxoStore for LmdbLedger {
    fn get_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>, StoreError> {
        let rtxn = self.read_txn()?;
        let prefix = address.as_str().as_bytes();
        let iter = self
            .address_utxos_db
            .prefix_iter(&rtxn, prefix)
            .map_err(LmdbError::from)?;
        let mut outputs = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let utxo = get_record(&self.utxos_db, &rtxn, &key[prefix.len()..])?.ok_or_else(|| {
                StoreError::Corruption(format!("address index for {address} points at a spent output"))
            })?;
            outputs.push(utxo);
        }
        Ok(outputs)
    }

    fn get_unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError> {
        let rtxn = self.read_txn()?;
        get_record(&self.utxos_db, &rtxn, &keys::outpoint(outpoint))
    }

    fn unspent_outpoints(&self) -> Result<Vec<OutPoint>, StoreError> {
        let rtxn = self.read_txn()?;
        let iter = self.utxos_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut outpoints = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            outpoints.push(keys::parse_outpoint(key).ok_or_else(|| {
                StoreError::Corruption(format!("unspent output key of {} bytes", key.len()))
            })?);
        }
        Ok(outpoints)
    }
}
