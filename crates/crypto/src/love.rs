//! # LOVE 検証委譲チケット
//!
//! ペアリング計算を委譲するための使い捨て事前計算束を生成する。
//! チケットはメッセージ内容に依存せず、これを提示された検証者は
//! 署名鍵を知ることなく同一鍵由来の署名間の関係を検査できる。
//!
//! 数学的にはチケットは再利用可能だが、既定の運用はリクエストごとの
//! 再生成である（ポリシーは `mklhs-client` 側の設定で選択する）。

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine, G2Projective};
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ec::CurveGroup;
use ark_ff::{Field, Zero};
use ark_std::UniformRand;

use mklhs_types::EncodedTicket;

use crate::codec::{encode_bytes, point_to_bytes, EncodingError};
use crate::CryptoError;

/// LOVE事前計算チケット。
///
/// `v2 = u2 · r⁻¹` と `e = e(u1, u2)` の2つの関係式が検証能力の本体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationTicket {
    /// ランダムスカラー
    pub r: Fr,
    /// 署名群のランダム元
    pub u1: G1Affine,
    /// 検証群のランダム元
    pub u2: G2Affine,
    /// `u2` を `r` の乗法逆元でスケールした元
    pub v2: G2Affine,
    /// ペアリング値 `e(u1, u2)`
    pub e: PairingOutput<Bls12_381>,
}

impl DelegationTicket {
    /// 5フィールドすべてを正準バイト列経由でBase64テキストにする。
    pub fn encode(&self) -> Result<EncodedTicket, EncodingError> {
        Ok(EncodedTicket {
            r: encode_bytes(&point_to_bytes(&self.r)?),
            u1: encode_bytes(&point_to_bytes(&self.u1)?),
            u2: encode_bytes(&point_to_bytes(&self.u2)?),
            v2: encode_bytes(&point_to_bytes(&self.v2)?),
            e: encode_bytes(&point_to_bytes(&self.e)?),
        })
    }
}

/// 新しい検証委譲チケットを生成する。
///
/// `r` は非零（逆元が必要）。失敗時は部分的なチケットを返さない。
pub fn generate_ticket() -> Result<DelegationTicket, CryptoError> {
    let mut rng = rand::thread_rng();

    let mut r = Fr::rand(&mut rng);
    for _ in 0..8 {
        if !r.is_zero() {
            break;
        }
        r = Fr::rand(&mut rng);
    }
    let r_inv = r
        .inverse()
        .ok_or_else(|| CryptoError::Ticket("rの逆元が存在しません".to_string()))?;

    let u1 = ark_bls12_381::G1Projective::rand(&mut rng).into_affine();
    let u2_proj = G2Projective::rand(&mut rng);
    let u2 = u2_proj.into_affine();
    let v2 = (u2_proj * r_inv).into_affine();
    let e = Bls12_381::pairing(u1, u2);

    Ok(DelegationTicket { r, u1, u2, v2, e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_bytes;
    use ark_serialize::CanonicalDeserialize;

    /// チケットの代数的関係 v2·r == u2 と e == e(u1, u2) を確認する
    #[test]
    fn test_ticket_relations_hold() {
        let ticket = generate_ticket().unwrap();
        assert_eq!((ticket.v2 * ticket.r).into_affine(), ticket.u2);
        assert_eq!(ticket.e, Bls12_381::pairing(ticket.u1, ticket.u2));
    }

    /// チケットがメッセージ内容と独立に、毎回異なる乱数で生成されることを確認する
    #[test]
    fn test_tickets_are_independent() {
        let a = generate_ticket().unwrap();
        let b = generate_ticket().unwrap();
        assert_ne!(a.r, b.r);
        assert_ne!(a.u1, b.u1);
        assert_ne!(a.e, b.e);
    }

    /// エンコード済みフィールドが期待する固定長のバイト列を持つことを確認する
    #[test]
    fn test_encoded_field_lengths() {
        let encoded = generate_ticket().unwrap().encode().unwrap();
        assert_eq!(decode_bytes(&encoded.r).unwrap().len(), 32);
        assert_eq!(decode_bytes(&encoded.u1).unwrap().len(), 48);
        assert_eq!(decode_bytes(&encoded.u2).unwrap().len(), 96);
        assert_eq!(decode_bytes(&encoded.v2).unwrap().len(), 96);
        assert_eq!(decode_bytes(&encoded.e).unwrap().len(), 576);
    }

    /// エンコードが可逆であることをrについて確認する
    #[test]
    fn test_encoded_r_roundtrip() {
        let ticket = generate_ticket().unwrap();
        let encoded = ticket.encode().unwrap();
        let bytes = decode_bytes(&encoded.r).unwrap();
        let r = Fr::deserialize_compressed(bytes.as_slice()).unwrap();
        assert_eq!(r, ticket.r);
    }
}
