//! # 転送エンコード
//!
//! 群元の正準（圧縮・固定長）バイトシリアライズと、転送安全な
//! Base64テキストエンコードを提供する。デコードは任意のバイト長
//! `L ≥ 0` に対してエンコードの厳密な逆写像である。
//!
//! 署名列のエンコードでは位置対応が本質的な不変条件となる:
//! `encoded[i]` は `datapoints[i]`・`tags[i]` に対応し、並べ替え・
//! 重複排除はどの段でも行わない。

use ark_bls12_381::{G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::Engine;

/// エンコード処理のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// Base64デコード失敗（不正な文字・長さ）
    #[error("Base64デコードに失敗しました: {0}")]
    Base64(#[from] base64::DecodeError),
    /// 群元のシリアライズ失敗
    #[error("群元のシリアライズに失敗しました: {0}")]
    Serialize(String),
    /// 群元のデシリアライズ失敗（曲線外の点を含む）
    #[error("群元のデシリアライズに失敗しました: {0}")]
    Deserialize(String),
    /// 署名列が空
    #[error("署名列が空です")]
    EmptySignatures,
}

/// Base64エンジン（STANDARDアルファベット、`=` パディング）
fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// バイト列をBase64テキストにエンコードする。
pub fn encode_bytes(data: &[u8]) -> String {
    b64().encode(data)
}

/// Base64テキストをバイト列へデコードする。`encode_bytes` の厳密な逆。
pub fn decode_bytes(text: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(b64().decode(text)?)
}

/// 群元を圧縮バイト列にシリアライズする。長さは曲線ごとに固定。
pub(crate) fn point_to_bytes<P: CanonicalSerialize>(point: &P) -> Result<Vec<u8>, EncodingError> {
    let mut bytes = Vec::with_capacity(point.compressed_size());
    point
        .serialize_compressed(&mut bytes)
        .map_err(|e| EncodingError::Serialize(e.to_string()))?;
    Ok(bytes)
}

/// 署名列をBase64テキスト列にエンコードする。
///
/// 戻り値の2要素目は署名1個の固定バイト長で、バッチ全体について
/// 一度だけ報告される（要素ごとには持たない）。入力の順序は
/// そのまま保存される。
pub fn encode_signatures(sigs: &[G1Affine]) -> Result<(Vec<String>, usize), EncodingError> {
    let first = sigs.first().ok_or(EncodingError::EmptySignatures)?;
    let sig_len = first.compressed_size();

    let mut encoded = Vec::with_capacity(sigs.len());
    for sig in sigs {
        encoded.push(encode_bytes(&point_to_bytes(sig)?));
    }
    Ok((encoded, sig_len))
}

/// Base64テキストから署名（G1元）を復元する。
pub fn decode_signature(text: &str) -> Result<G1Affine, EncodingError> {
    let bytes = decode_bytes(text)?;
    G1Affine::deserialize_compressed(bytes.as_slice())
        .map_err(|e| EncodingError::Deserialize(e.to_string()))
}

/// Base64テキストから公開鍵（G2元）を復元する。
pub fn decode_public_key(text: &str) -> Result<G2Affine, EncodingError> {
    let bytes = decode_bytes(text)?;
    G2Affine::deserialize_compressed(bytes.as_slice())
        .map_err(|e| EncodingError::Deserialize(e.to_string()))
}
