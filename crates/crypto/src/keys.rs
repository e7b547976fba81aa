//! # 鍵ペア管理
//!
//! 秘密鍵（署名指数）と検証群の公開鍵を生成・保持する。
//! 公開鍵は常に同一の生成呼び出しで秘密鍵から導出され、独立に生成された
//! ペア同士を混ぜることはできない。

use ark_bls12_381::{Fr, G2Affine, G2Projective};
use ark_ec::{CurveGroup, Group};
use ark_ff::Zero;
use ark_std::UniformRand;

use crate::codec::{encode_bytes, point_to_bytes, EncodingError};
use crate::CryptoError;

/// MKLHS署名鍵ペア。
///
/// 秘密鍵はこのクレートの外に出さない。署名・検証は公開APIを通して行う。
pub struct KeyPair {
    sk: Fr,
    /// 検証群（G2）の公開鍵: `pk = g2 · sk`
    pub pk: G2Affine,
}

impl KeyPair {
    /// 新しい鍵ペアを生成する。
    ///
    /// 秘密鍵は非零のランダムスカラー。失敗時は部分的な鍵素材を一切
    /// 有効とみなさない（fail-closed）。
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        // 零スカラーは公開鍵が単位元になり署名が退化するため排除する
        for _ in 0..8 {
            let sk = Fr::rand(&mut rng);
            if !sk.is_zero() {
                let pk = (G2Projective::generator() * sk).into_affine();
                return Ok(Self { sk, pk });
            }
        }
        Err(CryptoError::KeyGen("非零スカラーの抽選に失敗しました".to_string()))
    }

    /// 秘密鍵への参照。署名モジュール専用。
    pub(crate) fn secret(&self) -> &Fr {
        &self.sk
    }

    /// 公開鍵を圧縮バイト列にシリアライズし、Base64テキストにする。
    pub fn encode_public_key(&self) -> Result<String, EncodingError> {
        Ok(encode_bytes(&point_to_bytes(&self.pk)?))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 秘密鍵はログに出さない
        f.debug_struct("KeyPair").field("pk", &self.pk).finish_non_exhaustive()
    }
}
