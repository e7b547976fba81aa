//! # ワイヤ文書シリアライズ
//!
//! 署名付きバッチをサーバーへ送るための正準JSON文書を組み立てる。
//!
//! 文書は上限付きの蓄積バッファに書き込まれる。すべてのプリミティブ
//! 書き込みは残容量を事前に検査し、容量不足が一度でも起きると
//! シリアライザはエラー状態にラッチされ、以後の書き込みは何も行わずに
//! エラーを返し続ける。これにより、どんな入力サイズでも切り詰められた
//! 不正な文書が送信されることはない。
//!
//! フィールド順序は手書きのコンシューマとの形式互換のために固定:
//! `id`, `datapoints`, `signatures`, `signature_length`, `tags`,
//! `data_set_id`, `public_key`, `scale`, `function`,
//! （チケットがある場合のみ）`love_r`, `love_u1`, `love_u2`, `love_v2`, `love_e`。
//! `datapoints` / `signatures` / `tags` の3配列は添字対応しており、
//! この位置対応はそのまま保存される。

mod writer;

pub use writer::JsonWriter;

use writer::escaped_len;

use mklhs_types::{EncodedTicket, Message};

/// シリアライズのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// バッファ容量超過。文書は送信されない。
    #[error("シリアライズバッファの容量を超過しました（容量 {capacity} バイト）")]
    CapacityExceeded {
        /// バッファの上限バイト数
        capacity: usize,
    },
    /// 並列配列の長さ不一致
    #[error("配列長が一致しません: datapoints={datapoints}, signatures={signatures}, tags={tags}")]
    LengthMismatch {
        /// データポイント数
        datapoints: usize,
        /// 署名数
        signatures: usize,
        /// タグ数
        tags: usize,
    },
}

/// 署名付きリクエストの構成要素。
///
/// `signatures[i]` は `message.points[i]` に対応する。並べ替え・
/// 重複排除・ソートはいずれも禁止。
pub struct SignedRequest<'a> {
    /// 署名済みメッセージ（値・タグ・ラベル・スケール）
    pub message: &'a Message,
    /// Base64エンコード済み署名列（添字対応）
    pub signatures: &'a [String],
    /// 署名1個のバイト長（バッチ全体で一定、1回だけ報告する）
    pub signature_length: usize,
    /// Base64エンコード済み公開鍵
    pub public_key: &'a str,
    /// 署名が後に検証される線形関数の識別子（例: "doubling"）
    pub function: &'a str,
    /// 検証委譲チケット（省略可能）
    pub ticket: Option<&'a EncodedTicket>,
}

impl SignedRequest<'_> {
    /// この文書を収めるのに十分なバッファ容量の見積もり。
    ///
    /// 固定リテラルとキー名、要素ごとの区切りを保守的に上乗せする。
    /// 文字列入力は生の長さではなくエスケープ適用後の長さで数える。
    pub fn capacity_hint(&self) -> usize {
        let mut hint = 256;
        hint += escaped_len(&self.message.label.device_id);
        hint += escaped_len(&self.message.label.data_set_id);
        hint += escaped_len(self.public_key);
        hint += escaped_len(self.function);
        for point in &self.message.points {
            // 値（最大20桁）+ タグ + 引用符と区切り
            hint += 20 + escaped_len(&point.tag) + 8;
        }
        for sig in self.signatures {
            hint += escaped_len(sig) + 4;
        }
        if let Some(ticket) = self.ticket {
            hint += escaped_len(&ticket.r) + escaped_len(&ticket.u1) + escaped_len(&ticket.u2);
            hint += escaped_len(&ticket.v2) + escaped_len(&ticket.e);
            hint += 64;
        }
        hint
    }

    /// 署名付きワイヤ文書を組み立てる。
    pub fn serialize(&self, capacity: usize) -> Result<Vec<u8>, WireError> {
        let n = self.message.len();
        if self.signatures.len() != n {
            return Err(WireError::LengthMismatch {
                datapoints: n,
                signatures: self.signatures.len(),
                tags: n,
            });
        }

        let mut w = JsonWriter::new(capacity);
        w.begin_object()?;

        w.field_string("id", &self.message.label.device_id)?;

        w.key("datapoints")?;
        w.begin_array()?;
        for value in self.message.values() {
            w.number(value)?;
            w.comma()?;
        }
        w.end_array()?;
        w.comma()?;

        w.key("signatures")?;
        w.begin_array()?;
        for sig in self.signatures {
            w.string(sig)?;
            w.comma()?;
        }
        w.end_array()?;
        w.comma()?;

        w.field_number("signature_length", self.signature_length as u64)?;

        w.key("tags")?;
        w.begin_array()?;
        for tag in self.message.tags() {
            w.string(tag)?;
            w.comma()?;
        }
        w.end_array()?;
        w.comma()?;

        w.field_string("data_set_id", &self.message.label.data_set_id)?;
        w.field_string("public_key", self.public_key)?;
        w.field_number("scale", self.message.scale)?;
        w.field_string("function", self.function)?;

        if let Some(ticket) = self.ticket {
            w.field_string("love_r", &ticket.r)?;
            w.field_string("love_u1", &ticket.u1)?;
            w.field_string("love_u2", &ticket.u2)?;
            w.field_string("love_v2", &ticket.v2)?;
            w.field_string("love_e", &ticket.e)?;
        }

        w.end_object()?;
        w.into_bytes()
    }
}

/// ベースライン（無署名）リクエスト。
///
/// `signatures` / `signature_length` / `public_key` / `function` と
/// チケットフィールドを持たない。
pub struct RawRequest<'a> {
    /// メッセージ（値・タグ・ラベル・スケール）
    pub message: &'a Message,
}

impl RawRequest<'_> {
    /// この文書を収めるのに十分なバッファ容量の見積もり。
    /// 文字列入力はエスケープ適用後の長さで数える。
    pub fn capacity_hint(&self) -> usize {
        let mut hint = 128;
        hint += escaped_len(&self.message.label.device_id);
        hint += escaped_len(&self.message.label.data_set_id);
        for point in &self.message.points {
            hint += 20 + escaped_len(&point.tag) + 8;
        }
        hint
    }

    /// 無署名ワイヤ文書を組み立てる。
    pub fn serialize(&self, capacity: usize) -> Result<Vec<u8>, WireError> {
        let mut w = JsonWriter::new(capacity);
        w.begin_object()?;

        w.field_string("id", &self.message.label.device_id)?;

        w.key("datapoints")?;
        w.begin_array()?;
        for value in self.message.values() {
            w.number(value)?;
            w.comma()?;
        }
        w.end_array()?;
        w.comma()?;

        w.key("tags")?;
        w.begin_array()?;
        for tag in self.message.tags() {
            w.string(tag)?;
            w.comma()?;
        }
        w.end_array()?;
        w.comma()?;

        w.field_string("data_set_id", &self.message.label.data_set_id)?;
        w.field_number("scale", self.message.scale)?;

        w.end_object()?;
        w.into_bytes()
    }
}
