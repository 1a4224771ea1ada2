// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw device-key rows. Encryption happens in [`crate::keystore`].

use rusqlite::params;
use wagate_core::WagateError;
use wagate_core::types::now_timestamp;

use crate::database::{Database, map_tr_err};

/// A sealed device blob as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedDevice {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

pub async fn get_device(db: &Database, device_id: &str) -> Result<Option<SealedDevice>, WagateError> {
    let device_id = device_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SealedDevice>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT nonce, ciphertext FROM device_keys WHERE device_id = ?1",
                params![device_id],
                |row| {
                    Ok(SealedDevice {
                        nonce: row.get(0)?,
                        ciphertext: row.get(1)?,
                    })
                },
            );
            match result {
                Ok(device) => Ok(Some(device)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn put_device(
    db: &Database,
    device_id: &str,
    sealed: SealedDevice,
) -> Result<(), WagateError> {
    let device_id = device_id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO device_keys (device_id, nonce, ciphertext, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(device_id) DO UPDATE SET
                    nonce = excluded.nonce,
                    ciphertext = excluded.ciphertext,
                    updated_at = excluded.updated_at",
                params![device_id, sealed.nonce, sealed.ciphertext, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_device(db: &Database, device_id: &str) -> Result<bool, WagateError> {
    let device_id = device_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM device_keys WHERE device_id = ?1",
                params![device_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_devices(db: &Database) -> Result<Vec<String>, WagateError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT device_id FROM device_keys ORDER BY device_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
