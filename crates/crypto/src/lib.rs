//! # MKLHS 暗号プリミティブ
//!
//! BLS12-381ペアリング上のラベル付き線形準同型署名（MKLHS）と、
//! LOVE検証委譲チケットの生成を実装する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 署名群 | BLS12-381 G1（圧縮48バイト） |
//! | 検証群 | BLS12-381 G2（圧縮96バイト） |
//! | ハッシュ | WB hash-to-curve (XMD:SHA-256) |
//! | 転送エンコード | Base64（STANDARD、`=` パディング） |
//!
//! ## 署名の形
//! 値 `m`、ラベル `(data_set_id, device_id)`、タグ `τ` に対して
//!
//! ```text
//! σ = sk · ( H1(device_id ‖ τ) + m · H1(data_set_id) )
//! ```
//!
//! `(value, data_set_id, device_id, tag, sk)` のいずれかが変われば署名は
//! 無関係な値になる。同一ラベル下の署名は線形結合可能で、サーバーは
//! 署名鍵なしに値の線形関数を検証できる。

mod codec;
mod keys;
mod love;
mod sign;

pub use codec::{
    decode_bytes, decode_public_key, decode_signature, encode_bytes, encode_signatures,
    EncodingError,
};
pub use keys::KeyPair;
pub use love::{generate_ticket, DelegationTicket};
pub use sign::{sign_message, verify_one, Signature, SIGNATURE_BYTES};

pub use ark_bls12_381::{Fr, G1Affine, G2Affine};

/// 暗号処理のエラー型。いずれも当該イテレーションを中断させる。
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 鍵生成エラー
    #[error("鍵生成に失敗しました: {0}")]
    KeyGen(String),
    /// hash-to-curveエラー
    #[error("曲線へのハッシュに失敗しました: {0}")]
    Hash(String),
    /// LOVEチケット生成エラー
    #[error("検証委譲チケットの生成に失敗しました: {0}")]
    Ticket(String),
}
