//! # 上限付きJSONライタ
//!
//! 事前に確保した容量を超えない単一JSONオブジェクトの書き込み器。
//! すべてのプリミティブ書き込みは残容量を先に検査し、不足が検出された
//! 時点でエラー状態にラッチされる。以後の書き込みはバッファに触れずに
//! エラーを返し続け、境界外書き込みは構造的に起こりえない。
//!
//! コンテナを閉じる操作は直前の区切りカンマを取り除くため、要素数に
//! かかわらず文書は構文的に正しい。

use crate::WireError;

/// 上限付き蓄積バッファへのJSON書き込み器。
pub struct JsonWriter {
    buf: Vec<u8>,
    capacity: usize,
    poisoned: bool,
}

impl JsonWriter {
    /// 容量 `capacity` バイトの書き込み器を作る。
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.min(4096)),
            capacity,
            poisoned: false,
        }
    }

    /// 現在の書き込み済みバイト数。
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// 何も書き込まれていないかどうか。
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// エラー状態にラッチされているかどうか。
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn err(&self) -> WireError {
        WireError::CapacityExceeded { capacity: self.capacity }
    }

    /// 容量検査付きの生書き込み。ラッチ済みなら何もせずエラーを返す。
    fn raw(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if self.poisoned {
            return Err(self.err());
        }
        if self.buf.len() + bytes.len() > self.capacity {
            self.poisoned = true;
            return Err(self.err());
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// オブジェクトを開く。
    pub fn begin_object(&mut self) -> Result<(), WireError> {
        self.raw(b"{")
    }

    /// オブジェクトを閉じる。末尾の区切りカンマがあれば取り除く。
    pub fn end_object(&mut self) -> Result<(), WireError> {
        self.strip_trailing_comma()?;
        self.raw(b"}")
    }

    /// 配列を開く。
    pub fn begin_array(&mut self) -> Result<(), WireError> {
        self.raw(b"[")
    }

    /// 配列を閉じる。末尾の区切りカンマがあれば取り除く。
    pub fn end_array(&mut self) -> Result<(), WireError> {
        self.strip_trailing_comma()?;
        self.raw(b"]")
    }

    fn strip_trailing_comma(&mut self) -> Result<(), WireError> {
        if self.poisoned {
            return Err(self.err());
        }
        if self.buf.last() == Some(&b',') {
            self.buf.pop();
        }
        Ok(())
    }

    /// 区切りカンマ。
    pub fn comma(&mut self) -> Result<(), WireError> {
        self.raw(b",")
    }

    /// キーを書く: `"key":`
    pub fn key(&mut self, key: &str) -> Result<(), WireError> {
        self.raw(b"\"")?;
        self.raw(key.as_bytes())?;
        self.raw(b"\":")
    }

    /// 文字列値を書く。引用符・バックスラッシュ・制御文字はエスケープする。
    pub fn string(&mut self, value: &str) -> Result<(), WireError> {
        let escaped = escape(value);
        self.raw(b"\"")?;
        self.raw(&escaped)?;
        self.raw(b"\"")
    }

    /// 符号なし整数値を書く。
    pub fn number(&mut self, value: u64) -> Result<(), WireError> {
        let mut digits = [0u8; 20];
        let mut pos = digits.len();
        let mut rest = value;
        loop {
            pos -= 1;
            digits[pos] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        self.raw(&digits[pos..])
    }

    /// 文字列フィールドを区切りカンマ付きで書く。
    pub fn field_string(&mut self, key: &str, value: &str) -> Result<(), WireError> {
        self.key(key)?;
        self.string(value)?;
        self.comma()
    }

    /// 数値フィールドを区切りカンマ付きで書く。
    pub fn field_number(&mut self, key: &str, value: u64) -> Result<(), WireError> {
        self.key(key)?;
        self.number(value)?;
        self.comma()
    }

    /// 完成した文書を取り出す。ラッチ済みの場合はエラー。
    pub fn into_bytes(self) -> Result<Vec<u8>, WireError> {
        if self.poisoned {
            return Err(WireError::CapacityExceeded { capacity: self.capacity });
        }
        Ok(self.buf)
    }
}

/// エスケープ適用後のバイト長。容量見積もりは生の長さではなく
/// この値を使う必要がある。
pub(crate) fn escaped_len(value: &str) -> usize {
    value
        .bytes()
        .map(|byte| match byte {
            b'"' | b'\\' | b'\n' | b'\r' | b'\t' => 2,
            c if c < 0x20 => 6,
            _ => 1,
        })
        .sum()
}

/// JSON文字列値のエスケープ。引用符・バックスラッシュ・制御文字のみ対象。
fn escape(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            c if c < 0x20 => {
                out.extend_from_slice(format!("\\u{c:04x}").as_bytes());
            }
            c => out.push(c),
        }
    }
    out
}
