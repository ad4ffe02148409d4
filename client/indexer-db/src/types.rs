use diesel::{
    deserialize::{FromSql, Result as DeserializeResult},
    pg::{Pg, PgValue},
    serialize::{IsNull, Output, Result as SerializeResult, ToSql},
    sql_types::{BigInt, SmallInt},
    AsExpression, FromSqlRow,
};
use serde::{Deserialize, Serialize};
use std::{fmt, io::Write};

/// Surrogate row identifier, unique per chain within a table.
///
/// SIDs are assigned by the indexer, never reused and used as the correlation key
/// of batched updates. Postgres has no unsigned integers so they are stored as `BIGINT`;
/// decoding rejects anything that does not fit in a `u32`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
)]
#[diesel(sql_type = BigInt)]
#[serde(transparent)]
pub struct Sid(u32);

impl Sid {
    pub const fn new(sid: u32) -> Self {
        Self(sid)
    }

    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Sid {
    fn from(sid: u32) -> Self {
        Self(sid)
    }
}

impl From<Sid> for u32 {
    fn from(sid: Sid) -> u32 {
        sid.0
    }
}

impl From<Sid> for i64 {
    fn from(sid: Sid) -> i64 {
        i64::from(sid.0)
    }
}

impl TryFrom<i64> for Sid {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| format!("SID {} is out of the u32 range", raw))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql<BigInt, Pg> for Sid {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> SerializeResult {
        // Same wire format as `i64`: 8 bytes, network order.
        out.write_all(&i64::from(self.0).to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<BigInt, Pg> for Sid {
    fn from_sql(bytes: PgValue<'_>) -> DeserializeResult<Self> {
        let raw = <i64 as FromSql<BigInt, Pg>>::from_sql(bytes)?;
        Ok(Sid::try_from(raw)?)
    }
}

/// How transfers of an inscription are recognised on chain.
///
/// Stored as `SMALLINT`; decoding rejects values with no variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow, Serialize, Deserialize,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    /// Transfers reference the inscription by its deploy hash.
    Hash = 0,
    /// Transfers are emitted as contract events.
    Event = 1,
    /// Balances are carried by UTXOs.
    Utxo = 2,
}

impl TryFrom<i16> for TransferType {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Hash),
            1 => Ok(Self::Event),
            2 => Ok(Self::Utxo),
            _ => Err(v),
        }
    }
}

impl From<TransferType> for i16 {
    fn from(transfer_type: TransferType) -> i16 {
        transfer_type as i16
    }
}

impl ToSql<SmallInt, Pg> for TransferType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> SerializeResult {
        out.write_all(&i16::from(*self).to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for TransferType {
    fn from_sql(bytes: PgValue<'_>) -> DeserializeResult<Self> {
        let raw = <i16 as FromSql<SmallInt, Pg>>::from_sql(bytes)?;
        Ok(TransferType::try_from(raw).map_err(|v| format!("unknown transfer type {}", v))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoStatus {
    Unspent = 1,
    Spent = 2,
}

impl TryFrom<i16> for UtxoStatus {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Unspent),
            2 => Ok(Self::Spent),
            _ => Err(v),
        }
    }
}

/// Event recorded against an address or a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    Deploy = 1,
    Mint = 2,
    Transfer = 3,
}

impl TryFrom<i16> for TxEvent {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Deploy),
            2 => Ok(Self::Mint),
            3 => Ok(Self::Transfer),
            _ => Err(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sid_converts_from_database_integers() {
        assert_eq!(Sid::try_from(7i64), Ok(Sid::new(7)));
        assert_eq!(i64::from(Sid::new(u32::MAX)), 4_294_967_295);
        assert!(Sid::try_from(-1i64).is_err());
        assert!(Sid::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn sid_serializes_as_a_plain_number() {
        let json = serde_json::to_string(&Sid::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: Sid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Sid::new(42));
    }

    #[test]
    fn enums_reject_unknown_discriminants() {
        assert_eq!(TransferType::try_from(1), Ok(TransferType::Event));
        assert_eq!(TransferType::try_from(9), Err(9));
        assert_eq!(UtxoStatus::try_from(1), Ok(UtxoStatus::Unspent));
        assert_eq!(TxEvent::try_from(0), Err(0));
    }

    #[test]
    fn transfer_type_maps_to_its_discriminant() {
        for (variant, raw) in [
            (TransferType::Hash, 0),
            (TransferType::Event, 1),
            (TransferType::Utxo, 2),
        ] {
            assert_eq!(i16::from(variant), raw);
            assert_eq!(TransferType::try_from(raw), Ok(variant));
        }
        assert_eq!(TransferType::try_from(-1), Err(-1));
        assert_eq!(TransferType::try_from(3), Err(3));
    }

    #[test]
    fn transfer_type_serializes_by_name() {
        let json = serde_json::to_string(&TransferType::Utxo).unwrap();
        assert_eq!(json, "\"utxo\"");
        assert!(serde_json::from_str::<TransferType>("\"bogus\"").is_err());
    }
}
