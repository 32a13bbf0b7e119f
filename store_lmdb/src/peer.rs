//! LMDB implementation of PeerStore.

use denaro_store::{PeerStore, StoreError};

use crate::environment::LmdbLedger;
use crate::LmdbError;

impl PeerStore for LmdbLedger {
    fn put_peer(&self, url: &str, last_seen: u64) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.peers_db
            .put(&mut wtxn, url.as_bytes(), &last_seen.to_le_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_peer(&self, url: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.peers_db
            .delete(&mut wtxn, url.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_peers(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let rtxn = self.read_txn()?;
        let iter = self.peers_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut peers = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let (Ok(url), Ok(ts)) = (std::str::from_utf8(key), <[u8; 8]>::try_from(val)) else {
                continue;
            };
            peers.push((url.to_string(), u64::from_le_bytes(ts)));
        }
        Ok(peers)
    }
}
