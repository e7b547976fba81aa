//! # ラベル付き署名
//!
//! データポイントごとにラベル `(data_set_id, device_id)` とタグに
//! 束縛された署名を生成する。ループは厳密に逐次で、最初の失敗で
//! 中断する。1点でも失敗したバッチは署名なしとみなされ、部分バッチの
//! 送信は許されない。

use ark_bls12_381::{g1, Bls12_381, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::hashing::curve_maps::wb::WBMap;
use ark_ec::hashing::map_to_curve_hasher::MapToCurveBasedHasher;
use ark_ec::hashing::HashToCurve;
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::field_hashers::DefaultFieldHasher;
use sha2::Sha256;

use mklhs_types::{Label, Message};

use crate::{CryptoError, KeyPair};

/// MKLHS署名。署名群（G1）の元。
pub type Signature = G1Affine;

/// 署名1個の圧縮バイト長（BLS12-381 G1）。
pub const SIGNATURE_BYTES: usize = 48;

/// hash-to-curveのドメイン分離タグ
const DST: &[u8] = b"MKLHS-V01-CS01-with-BLS12381G1_XMD:SHA-256_SSWU_RO_";

type G1Hasher = MapToCurveBasedHasher<G1Projective, DefaultFieldHasher<Sha256, 128>, WBMap<g1::Config>>;

/// バイト列をG1の点にハッシュする。
fn hash_to_g1(input: &[u8]) -> Result<G1Affine, CryptoError> {
    let hasher = G1Hasher::new(DST).map_err(|e| CryptoError::Hash(e.to_string()))?;
    hasher.hash(input).map_err(|e| CryptoError::Hash(e.to_string()))
}

/// データセット識別子に対応するG1の点: `H1(data_set_id)`
fn dataset_point(data_set_id: &str) -> Result<G1Affine, CryptoError> {
    hash_to_g1(data_set_id.as_bytes())
}

/// (デバイス識別子, タグ) に対応するG1の点。
///
/// 連結の曖昧さ（"ab"+"c" と "a"+"bc" の衝突）を避けるため、
/// デバイス識別子は長さプレフィックス付きで符号化する。
fn tag_point(device_id: &str, tag: &str) -> Result<G1Affine, CryptoError> {
    let mut input = Vec::with_capacity(4 + device_id.len() + tag.len());
    input.extend_from_slice(&(device_id.len() as u32).to_be_bytes());
    input.extend_from_slice(device_id.as_bytes());
    input.extend_from_slice(tag.as_bytes());
    hash_to_g1(&input)
}

/// 1個の値に対するラベル付き署名:
/// `σ = sk · ( H1(device_id ‖ τ) + m · H1(data_set_id) )`
fn sign_one(sk: &Fr, value: u64, label: &Label, tag: &str) -> Result<Signature, CryptoError> {
    let h_ds = dataset_point(&label.data_set_id)?;
    let h_tag = tag_point(&label.device_id, tag)?;
    let m = Fr::from(value);
    let sigma = (h_tag.into_group() + h_ds.into_group() * m) * *sk;
    Ok(sigma.into_affine())
}

/// メッセージの全データポイントを逐次署名する。
///
/// `signatures[i]` は `points[i]` に対応する。いずれかの署名が失敗した
/// 場合はバッチ全体を中断し、それまでに生成した署名は破棄される。
pub fn sign_message(message: &Message, keys: &KeyPair) -> Result<Vec<Signature>, CryptoError> {
    let sk = keys.secret();
    sign_message_with(message, |value, tag| sign_one(sk, value, &message.label, tag))
}

/// 署名プリミティブを注入可能にした逐次署名ループ。
///
/// 失敗時に部分結果を返さないという原子性はこの関数が保証する。
fn sign_message_with<F>(message: &Message, mut sign_fn: F) -> Result<Vec<Signature>, CryptoError>
where
    F: FnMut(u64, &str) -> Result<Signature, CryptoError>,
{
    let mut sigs = Vec::with_capacity(message.len());
    for point in &message.points {
        sigs.push(sign_fn(point.value, &point.tag)?);
    }
    Ok(sigs)
}

/// 単一署名の検証述語:
/// `e(σ, g2) == e(H1(device_id ‖ τ) + m · H1(data_set_id), pk)`
///
/// テストと診断用。線形結合に対するサーバー側の検証はここでは扱わない。
pub fn verify_one(
    sig: &Signature,
    value: u64,
    label: &Label,
    tag: &str,
    pk: &G2Affine,
) -> Result<bool, CryptoError> {
    let h_ds = dataset_point(&label.data_set_id)?;
    let h_tag = tag_point(&label.device_id, tag)?;
    let base = (h_tag.into_group() + h_ds.into_group() * Fr::from(value)).into_affine();

    let lhs = Bls12_381::pairing(*sig, G2Affine::generator());
    let rhs = Bls12_381::pairing(base, *pk);
    Ok(lhs == rhs)
}
