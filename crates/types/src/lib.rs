//! # MKLHS クライアント共有型定義
//!
//! バッチ署名パイプラインのデータモデルを提供する。
//!
//! ## 用語
//! - **ラベル**: `(data_set_id, device_id)` の組。1つのメッセージ内の
//!   全データポイントが共有する。
//! - **タグ**: データポイントごとの一意なトークン。同一バッチ内で
//!   衝突してはならない。
//! - **メッセージ**: 1つのラベルと `n ≥ 1` 個のデータポイントの列。

use serde::{Deserialize, Serialize};

mod builder;

pub use builder::{build_message, ValuePolicy};

// ---------------------------------------------------------------------------
// エラー型
// ---------------------------------------------------------------------------

/// メッセージ構築時の検証エラー型。呼び出し側の入力不備に起因する。
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// データポイント数が0
    #[error("データポイント数は1以上である必要があります")]
    EmptyBatch,
    /// ラベルが空文字列
    #[error("ラベルが不正です: {0} が空です")]
    EmptyLabel(&'static str),
    /// 数値ポリシーの範囲が不正（min >= max、または負のドメイン）
    #[error("値生成ポリシーの範囲が不正です: {0}")]
    InvalidRange(String),
}

// ---------------------------------------------------------------------------
// ラベルとデータポイント
// ---------------------------------------------------------------------------

/// 署名の文脈を固定するラベル。メッセージ内の全データポイントで共有される。
///
/// `data_set_id` は論理的なセンサーストリーム、`device_id` は物理的な
/// 発信元を識別する。異なるラベルの下で作られた署名は互いに結合できない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// データセット識別子（例: "test.db"）
    pub data_set_id: String,
    /// デバイス識別子（例: "12345"）
    pub device_id: String,
}

impl Label {
    /// ラベルを検証付きで構築する。空の識別子は拒否する。
    pub fn new(data_set_id: impl Into<String>, device_id: impl Into<String>) -> Result<Self, ValidationError> {
        let data_set_id = data_set_id.into();
        let device_id = device_id.into();
        if data_set_id.is_empty() {
            return Err(ValidationError::EmptyLabel("data_set_id"));
        }
        if device_id.is_empty() {
            return Err(ValidationError::EmptyLabel("device_id"));
        }
        Ok(Self { data_set_id, device_id })
    }
}

/// 1個の計測値とそのタグ。
///
/// `value` は符号なし整数。浮動小数点のサンプルはスケール倍して切り捨てた
/// 値を保持する（スケール係数はリクエストに同梱され、サーバー側で復元する）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// 計測値（スケール適用済み）
    pub value: u64,
    /// バッチ内で一意なタグ（時刻順序性を持つトークン）
    pub tag: String,
}

// ---------------------------------------------------------------------------
// メッセージ
// ---------------------------------------------------------------------------

/// 1回の送信単位。1つのラベルと順序付きデータポイント列を持つ。
///
/// 不変条件: `points.len() ≥ 1`、全タグはバッチ内で一意、
/// 署名列（`mklhs-crypto` 側で生成）は `points` と添字対応する。
/// 並べ替え・重複排除・ソートはいずれも禁止。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// 共有ラベル
    pub label: Label,
    /// 順序付きデータポイント列
    pub points: Vec<DataPoint>,
    /// 値生成に使用したスケール係数（整数ポリシーでは1）
    pub scale: u64,
}

impl Message {
    /// データポイント数。
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// データポイントが存在しないかどうか。構築経路上は常にfalse。
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 値の列を添字順に返す。
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// タグの列を添字順に返す。
    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.points.iter().map(|p| p.tag.as_str())
    }
}

// ---------------------------------------------------------------------------
// 検証委譲チケット（エンコード済み表現）
// ---------------------------------------------------------------------------

/// Base64エンコード済みのLOVE検証委譲チケット。
///
/// 5つのフィールドはメッセージ内容に依存せず、署名鍵を持たない検証者が
/// 署名間の線形関係を検査するための能力（capability）を構成する。
/// 生成は `mklhs-crypto`、ワイヤ文書への書き込みは `mklhs-wire` が担う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTicket {
    /// ランダムスカラー r
    pub r: String,
    /// 署名群のランダム元 u1
    pub u1: String,
    /// 検証群のランダム元 u2
    pub u2: String,
    /// v2 = u2 · r⁻¹
    pub v2: String,
    /// ペアリング値 e(u1, u2)
    pub e: String,
}
